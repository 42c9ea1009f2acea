use anyhow::Result;
use essay_grader::utils::logging;
use essay_grader::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    let stats = App::initialize(config)?.run().await?;

    if stats.total > 0 && stats.success == 0 {
        anyhow::bail!("所有作文均评分失败");
    }

    Ok(())
}
