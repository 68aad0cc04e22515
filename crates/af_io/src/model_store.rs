// crates/af_io/src/model_store.rs

//! 模型存储
//!
//! 拟合模型以带标签和版本号的 JSON 封套落盘。封套自带列模式，
//! 加载方用它校验推理表，避免列错位悄悄产出错误预测。
//!
//! # 封套格式
//!
//! ```json
//! {
//!   "tag": "AFMD",
//!   "format_version": 1,
//!   "id": "…uuid…",
//!   "created_at": "…",
//!   "family": "random_forest",
//!   "schema": ["aod", "…"],
//!   "model": { … }
//! }
//! ```

use af_foundation::error::{AfError, AfResult};
use af_model::FittedModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// 封套标签
const MODEL_TAG: &str = "AFMD";
/// 当前封套格式版本
const FORMAT_VERSION: u32 = 1;

/// 模型封套
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEnvelope {
    /// 格式标签，恒为 "AFMD"
    tag: String,
    /// 封套格式版本
    format_version: u32,
    /// 模型标识
    pub id: Uuid,
    /// 拟合时刻 (UTC)
    pub created_at: DateTime<Utc>,
    /// 估计器族名称
    pub family: String,
    /// 训练列模式（不含目标列）
    pub schema: Vec<String>,
    /// 模型本体
    pub model: FittedModel,
}

impl ModelEnvelope {
    /// 封装一个拟合模型
    #[must_use]
    pub fn new(model: FittedModel, schema: Vec<String>) -> Self {
        Self {
            tag: MODEL_TAG.to_string(),
            format_version: FORMAT_VERSION,
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            family: model.family_name().to_string(),
            schema,
            model,
        }
    }

    /// 校验标签与版本
    fn check_format(&self) -> AfResult<()> {
        if self.tag != MODEL_TAG {
            return Err(AfError::serialization(format!(
                "不是模型封套: 标签 {:?}",
                self.tag
            )));
        }
        if self.format_version != FORMAT_VERSION {
            return Err(AfError::FormatVersion {
                file: self.format_version,
                current: FORMAT_VERSION,
            });
        }
        Ok(())
    }
}

/// 模型存储目录
pub struct ModelStore {
    directory: PathBuf,
}

impl ModelStore {
    /// 绑定存储目录（不存在时创建）
    pub fn open(directory: impl Into<PathBuf>) -> AfResult<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    /// 保存模型，文件名为 `model-<id>.json`
    pub fn save(&self, envelope: &ModelEnvelope) -> AfResult<PathBuf> {
        let path = self.directory.join(format!("model-{}.json", envelope.id));
        let text = serde_json::to_string_pretty(envelope)
            .map_err(|e| AfError::serialization(e.to_string()))?;
        std::fs::write(&path, text)?;
        tracing::info!(path = %path.display(), family = %envelope.family, "model saved");
        Ok(path)
    }

    /// 从路径加载并校验封套
    ///
    /// # Errors
    /// 文件缺失、解析失败、标签错误或版本不兼容时返回错误。
    pub fn load(path: &Path) -> AfResult<ModelEnvelope> {
        if !path.exists() {
            return Err(AfError::file_not_found(path));
        }
        let text = std::fs::read_to_string(path)?;
        let envelope: ModelEnvelope = serde_json::from_str(&text)
            .map_err(|e| AfError::serialization(format!("模型封套解析失败: {e}")))?;
        envelope.check_format()?;
        Ok(envelope)
    }

    /// 列出目录中的模型文件，按文件名排序
    pub fn list(&self) -> AfResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&self.directory)? {
            let path = entry?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.starts_with("model-") && name.ends_with(".json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

// ============================================================================
// 测试
// ============================================================================
