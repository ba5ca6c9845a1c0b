// ==========================================
// 出库单自动指派系统 - 导入层错误类型
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入层错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("文件读取失败: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV 解析失败: {path} 第{row}行: {message}")]
    Csv {
        path: String,
        row: usize,
        message: String,
    },

    #[error("字段值错误: {path} 第{row}行 字段{field}: {message}")]
    InvalidField {
        path: String,
        row: usize,
        field: String,
        message: String,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
