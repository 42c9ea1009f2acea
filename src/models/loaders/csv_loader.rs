use crate::error::FileError;
use crate::models::essay::EssayInput;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// 从表格文件加载待评分的作文
///
/// # 参数
/// - `path`: 表格文件路径
/// - `id_column`: 作文编号列名
/// - `text_column`: 作文正文列名
/// - `delimiter`: 分隔符
///
/// # 返回
/// 按文件中的行序返回作文列表
pub fn load_essays(
    path: &Path,
    id_column: &str,
    text_column: &str,
    delimiter: u8,
) -> Result<Vec<EssayInput>> {
    if !path.exists() {
        anyhow::bail!(FileError::NotFound {
            path: path.display().to_string(),
        });
    }

    let file = std::fs::File::open(path)
        .with_context(|| format!("无法打开表格文件: {}", path.display()))?;

    let essays = read_essays(
        file,
        &path.display().to_string(),
        id_column,
        text_column,
        delimiter,
    )?;

    info!(
        "成功加载 {} 篇作文: {}",
        essays.len(),
        path.file_name().unwrap_or_default().to_string_lossy()
    );

    Ok(essays)
}

/// 从任意读取源解析作文表格
///
/// `source_name` 只用于错误信息。编号为空的行会被跳过。
pub fn read_essays<R: Read>(
    reader: R,
    source_name: &str,
    id_column: &str,
    text_column: &str,
    delimiter: u8,
) -> Result<Vec<EssayInput>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .with_context(|| format!("无法读取表头: {}", source_name))?
        .clone();

    let find_column = |column: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| {
                FileError::MissingColumn {
                    path: source_name.to_string(),
                    column: column.to_string(),
                    available: headers.iter().map(|h| h.to_string()).collect(),
                }
                .into()
            })
    };
    let id_idx = find_column(id_column)?;
    let text_idx = find_column(text_column)?;

    let mut essays = Vec::new();
    for (row_index, record) in csv_reader.records().enumerate() {
        // 表头占第 1 行
        let line = row_index + 2;
        let record =
            record.with_context(|| format!("解析表格失败 ({} 第 {} 行)", source_name, line))?;

        let id = record.get(id_idx).unwrap_or_default().trim();
        if id.is_empty() {
            warn!("⚠️ 第 {} 行缺少作文编号，已跳过", line);
            continue;
        }
        let text = record.get(text_idx).unwrap_or_default();

        essays.push(EssayInput::new(id, text));
    }

    Ok(essays)
}
