// crates/af_pipeline/src/runner.rs

//! 管线运行器
//!
//! 固定阶段顺序执行一次完整的估计运行：
//!
//! 1. 构建参考格网与时间轴
//! 2. 对齐全部栅格源（任一源零重叠即中止）
//! 3. 匹配站点观测
//! 4. 构建训练表并交叉验证 + 拟合
//! 5. 构建推理表（与训练表同列模式）并生成预测面
//!
//! 阶段之间只通过显式产物衔接，运行器本身无隐藏状态。

use af_config::{PipelineConfig, ResampleRule};
use af_foundation::error::{AfError, AfResult};
use af_geo::field::GriddedField;
use af_geo::grid::ReferenceGrid;
use af_geo::time_index::TimeIndex;
use af_fusion::{
    FeatureTable, FeatureTableBuilder, GridAligner, GriddedFieldSource, StationMatcher,
    StationSource,
};
use af_model::{FittedModel, ModelTrainer, TrainingOutcome};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::summary::{RunSummary, SourceSummary};

/// 一次运行的全部产物
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// 参考格网
    pub grid: ReferenceGrid,
    /// 时间槽时刻
    pub timestamps: Vec<DateTime<Utc>>,
    /// 最终模型
    pub model: FittedModel,
    /// 训练列模式
    pub schema: Vec<String>,
    /// PM2.5 预测面
    pub surface: GriddedField,
    /// 训练产物（折指标、留出对）
    pub training: TrainingOutcome,
    /// 运行摘要
    pub summary: RunSummary,
}

/// 管线运行器
pub struct PipelineRunner {
    config: PipelineConfig,
}

impl PipelineRunner {
    /// 用校验过的配置创建运行器
    ///
    /// # Errors
    /// 配置不一致时返回配置错误。
    pub fn new(config: PipelineConfig) -> AfResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// 配置
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 执行一次完整运行
    ///
    /// `gridded` 中每个源携带自己的重采样规则，整条管线固定不变。
    ///
    /// # Errors
    /// 任一源零重叠、训练行不足或列模式不一致时中止。
    pub fn run(
        &self,
        gridded: &[(&dyn GriddedFieldSource, ResampleRule)],
        stations: &dyn StationSource,
    ) -> AfResult<PipelineOutput> {
        let run_id = Uuid::new_v4();
        tracing::info!(%run_id, "pipeline run started");

        // 阶段 1: 共享格网与时间轴
        let grid = ReferenceGrid::new(
            self.config.grid.lat_min,
            self.config.grid.lat_max,
            self.config.grid.lon_min,
            self.config.grid.lon_max,
            self.config.grid.resolution,
        )?;
        let time_index = TimeIndex::new(
            self.config.time.start,
            self.config.time.end,
            self.config.time.granularity.step(),
        )?;
        tracing::info!(
            n_cells = grid.n_cells(),
            n_slots = time_index.len(),
            "stage 1: reference grid built"
        );

        // 阶段 2: 对齐
        let aligner = GridAligner::new(&grid, &time_index);
        let mut fields = Vec::with_capacity(gridded.len());
        let mut source_summaries = Vec::with_capacity(gridded.len());
        for (source, rule) in gridded {
            let raw = source.fetch()?;
            let field = aligner.align(&raw, *rule)?;
            source_summaries.push(SourceSummary {
                name: field.name().to_string(),
                present: field.present_count(),
                missing: field.missing_count(),
            });
            fields.push(field);
        }
        tracing::info!(n_sources = fields.len(), "stage 2: sources aligned");

        // 阶段 3: 站点匹配
        let matcher = StationMatcher::new(&grid, &time_index, self.config.matcher.clone());
        let observations = stations.fetch()?;
        let (matched, match_report) = matcher.match_observations(&observations)?;
        tracing::info!(
            n_matched = match_report.n_matched,
            n_rejected = match_report.n_rejected(),
            "stage 3: stations matched"
        );

        // 阶段 4: 训练表 + 交叉验证 + 最终拟合
        let builder = FeatureTableBuilder::new(&grid, &time_index, &self.config.features);
        let (training_table, training_stats) = builder.build_training(&fields, &matched)?;
        let trainer = ModelTrainer::new(&self.config.model, &self.config.cv);
        let training = trainer.train(&training_table)?;
        tracing::info!(
            n_rows = training_table.features.n_rows(),
            r2 = training.overall.r2,
            "stage 4: model trained"
        );

        // 阶段 5: 推理表 + 预测面
        let (inference_table, inference_stats) = builder.build_inference(&fields)?;
        let predictor = GridPredictor::new(&grid, &time_index);
        let surface = predictor.predict(&training.model, &training.schema, &inference_table)?;
        tracing::info!(
            present = surface.present_count(),
            missing = surface.missing_count(),
            "stage 5: surface predicted"
        );

        let summary = RunSummary {
            run_id,
            created_at: Utc::now(),
            n_cells: grid.n_cells(),
            n_slots: time_index.len(),
            sources: source_summaries,
            match_report,
            training_stats,
            inference_stats,
            fold_outcomes: training.fold_outcomes.clone(),
            overall: training.overall,
            surface_present: surface.present_count(),
            surface_missing: surface.missing_count(),
        };

        Ok(PipelineOutput {
            grid,
            timestamps: time_index.iter().map(|(_, t)| t).collect(),
            model: training.model.clone(),
            schema: training.schema.clone(),
            surface,
            training,
            summary,
        })
    }
}

// ============================================================================
// 网格预测器
// ============================================================================

/// 网格预测器
///
/// 把模型应用到推理表，产出整格网的 PM2.5 预测面。
/// 推理表缺行的 (单元, 槽) 在预测面中保持缺失，从不外推。
pub struct GridPredictor<'a> {
    grid: &'a ReferenceGrid,
    time_index: &'a TimeIndex,
}

impl<'a> GridPredictor<'a> {
    /// 创建预测器
    #[must_use]
    pub fn new(grid: &'a ReferenceGrid, time_index: &'a TimeIndex) -> Self {
        Self { grid, time_index }
    }

    /// 生成预测面
    ///
    /// # Errors
    /// 推理表列模式与训练列模式不一致时返回
    /// [`AfError::SchemaMismatch`]。
    pub fn predict(
        &self,
        model: &FittedModel,
        schema: &[String],
        table: &FeatureTable,
    ) -> AfResult<GriddedField> {
        table.check_schema(schema)?;

        let predictions = model.predict_batch(table.rows());
        let mut surface =
            GriddedField::new_missing("pm25", self.grid.n_cells(), self.time_index.len());
        for (&(cell, slot), p) in table.keys().iter().zip(&predictions) {
            AfError::check_index("Cell", cell, self.grid.n_cells())?;
            surface.set(cell, slot, Some(*p));
        }
        Ok(surface)
    }
}

// ============================================================================
// 测试
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use af_config::{EstimatorKind, FeatureConfig};
    use af_geo::field::GriddedField;
    use chrono::{Duration, TimeZone};

    fn setup() -> (ReferenceGrid, TimeIndex) {
        let grid = ReferenceGrid::new(10.0, 13.0, 70.0, 73.0, 1.0).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
        let index = TimeIndex::new(start, end, Duration::days(1)).unwrap();
        (grid, index)
    }

    fn fitted(schema_len: usize) -> FittedModel {
        let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64; schema_len]).collect();
        let y: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let kind = EstimatorKind::RandomForest {
            n_trees: 5,
            max_depth: 4,
            min_samples_leaf: 1,
            seed: 42,
        };
        FittedModel::fit(&kind, &x, &y)
    }

    #[test]
    fn test_predictor_fills_resolvable_cells_only() {
        let (grid, index) = setup();
        let config = FeatureConfig {
            columns: vec!["aod".into()],
            derived: false,
            ..FeatureConfig::default()
        };
        let builder = FeatureTableBuilder::new(&grid, &index, &config);

        // 单元 5 槽 0 缺失，Drop 策略下该行不进推理表
        let mut field = GriddedField::from_values(
            "aod",
            9,
            2,
            (0..18).map(|i| Some(i as f64)).collect(),
        )
        .unwrap();
        field.set(5, 0, None);
        let (table, _) = builder.build_inference(&[field]).unwrap();

        let model = fitted(1);
        let predictor = GridPredictor::new(&grid, &index);
        let surface = predictor
            .predict(&model, &["aod".to_string()], &table)
            .unwrap();

        assert_eq!(surface.get(5, 0), None);
        assert!(surface.get(0, 0).is_some());
        assert_eq!(surface.missing_count(), 1);
    }

    #[test]
    fn test_predictor_schema_gate() {
        let (grid, index) = setup();
        let config = FeatureConfig {
            columns: vec!["aod".into()],
            derived: false,
            ..FeatureConfig::default()
        };
        let builder = FeatureTableBuilder::new(&grid, &index, &config);
        let field =
            GriddedField::from_values("aod", 9, 2, (0..18).map(|i| Some(i as f64)).collect())
                .unwrap();
        let (table, _) = builder.build_inference(&[field]).unwrap();

        let model = fitted(2);
        let predictor = GridPredictor::new(&grid, &index);
        let err = predictor
            .predict(
                &model,
                &["aod".to_string(), "temperature".to_string()],
                &table,
            )
            .unwrap_err();
        assert!(matches!(err, AfError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_predictor_deterministic() {
        let (grid, index) = setup();
        let config = FeatureConfig {
            columns: vec!["aod".into()],
            derived: false,
            ..FeatureConfig::default()
        };
        let builder = FeatureTableBuilder::new(&grid, &index, &config);
        let field =
            GriddedField::from_values("aod", 9, 2, (0..18).map(|i| Some(i as f64)).collect())
                .unwrap();
        let (table, _) = builder.build_inference(&[field]).unwrap();

        let model = fitted(1);
        let predictor = GridPredictor::new(&grid, &index);
        let schema = ["aod".to_string()];
        let a = predictor.predict(&model, &schema, &table).unwrap();
        let b = predictor.predict(&model, &schema, &table).unwrap();
        assert_eq!(a, b);
    }
}
