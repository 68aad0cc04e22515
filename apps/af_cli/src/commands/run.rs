// apps/af_cli/src/commands/run.rs

//! 运行估计管线命令
//!
//! 演示模式下用合成场景驱动整条管线（数据范围沿用原型生成器），
//! 产物写入输出目录：模型封套、仪表盘导出包与运行摘要。

use af_config::{PipelineConfig, ResampleRule};
use af_fusion::{
    GriddedFieldSource, MemoryGriddedSource, MemoryStationSource, SyntheticConfig,
    SyntheticScene,
};
use af_geo::time_index::TimeIndex;
use af_io::{write_json, DashboardBundle, ModelEnvelope, ModelStore};
use af_pipeline::PipelineRunner;
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use clap::Args;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// 运行参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径（省略时使用默认配置）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 输出目录
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// 合成场景站点数量
    #[arg(long, default_value = "25")]
    pub stations: usize,

    /// 合成场景源网格原生分辨率 (度)
    #[arg(long, default_value = "0.4")]
    pub native_resolution: f64,

    /// 合成场景缺失值比例 [0, 1)
    #[arg(long, default_value = "0.1")]
    pub missing_fraction: f64,

    /// 合成场景随机种子
    #[arg(long, default_value = "7")]
    pub seed: u64,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== AeroFuse 管线启动 ===");

    let config = match &args.config {
        Some(path) => PipelineConfig::load(path).context("加载配置失败")?,
        None => PipelineConfig::default(),
    };
    info!(
        "格网: lat [{}, {}], lon [{}, {}], 分辨率 {}°",
        config.grid.lat_min,
        config.grid.lat_max,
        config.grid.lon_min,
        config.grid.lon_max,
        config.grid.resolution
    );

    // 合成场景沿用配置的区域与时间轴
    let time_index = TimeIndex::new(
        config.time.start,
        config.time.end,
        config.time.granularity.step(),
    )
    .context("构建时间轴失败")?;
    let scene = SyntheticScene::new(SyntheticConfig {
        bounds: (
            config.grid.lat_min,
            config.grid.lat_max,
            config.grid.lon_min,
            config.grid.lon_max,
        ),
        native_resolution: args.native_resolution,
        times: time_index.iter().map(|(_, t)| t).collect(),
        n_stations: args.stations,
        station_step: Duration::days(1),
        missing_fraction: args.missing_fraction,
        seed: args.seed,
    });

    let gridded = vec![
        MemoryGriddedSource::new(scene.aod().context("生成 AOD 场失败")?),
        MemoryGriddedSource::new(scene.temperature().context("生成气温场失败")?),
        MemoryGriddedSource::new(scene.humidity().context("生成湿度场失败")?),
        MemoryGriddedSource::new(scene.wind_speed().context("生成风速场失败")?),
    ];
    let sources: Vec<(&dyn GriddedFieldSource, ResampleRule)> = gridded
        .iter()
        .map(|s| (s as &dyn GriddedFieldSource, ResampleRule::default()))
        .collect();
    let stations = MemoryStationSource::new(scene.stations().context("生成站点观测失败")?);
    info!("合成场景: {} 站点, {} 时间槽", args.stations, time_index.len());

    // 执行管线
    let start = Instant::now();
    let runner = PipelineRunner::new(config).context("配置校验失败")?;
    let output = runner.run(&sources, &stations).context("管线执行失败")?;
    let elapsed = start.elapsed();

    // 落盘产物
    std::fs::create_dir_all(&args.output)?;
    let store = ModelStore::open(args.output.join("models"))?;
    let envelope = ModelEnvelope::new(output.model.clone(), output.schema.clone());
    let model_path = store.save(&envelope)?;

    let bundle = DashboardBundle {
        created_at: Utc::now(),
        grid: output.grid.clone(),
        timestamps: output.timestamps.clone(),
        surface: output.surface.clone(),
        metrics: output.training.overall,
        fold_outcomes: output.training.fold_outcomes.clone(),
        validation_pairs: output.training.validation_pairs.clone(),
    };
    let bundle_path = args.output.join("bundle.json");
    bundle.save(&bundle_path)?;

    let summary_path = args.output.join("summary.json");
    write_json(&summary_path, &output.summary)?;

    info!("=== 管线完成 ===");
    info!("运行标识: {}", output.summary.run_id);
    info!(
        "匹配: {}/{} 条观测 (距离拒绝 {}, 时间拒绝 {})",
        output.summary.match_report.n_matched,
        output.summary.match_report.n_input,
        output.summary.match_report.rejected_distance,
        output.summary.match_report.rejected_time
    );
    info!(
        "留出折指标: MAE={:.2}, RMSE={:.2}, R²={:.3}",
        output.training.overall.mae, output.training.overall.rmse, output.training.overall.r2
    );
    info!(
        "预测面: {}/{} 单元有值",
        output.summary.surface_present,
        output.summary.surface_present + output.summary.surface_missing
    );
    info!("计算时间: {:.2} s", elapsed.as_secs_f64());
    info!("模型: {}", model_path.display());
    info!("导出包: {}", bundle_path.display());
    info!("摘要: {}", summary_path.display());

    Ok(())
}
