// apps/af_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 显示系统信息、默认配置与已保存的模型。

use af_config::PipelineConfig;
use af_geo::grid::ReferenceGrid;
use af_io::ModelStore;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 显示系统信息
    #[arg(long)]
    pub system: bool,

    /// 显示默认配置
    #[arg(long)]
    pub defaults: bool,

    /// 列出目录中已保存的模型
    #[arg(long)]
    pub models: Option<PathBuf>,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("=== AeroFuse 信息 ===");

    if let Some(dir) = &args.models {
        return list_models(dir);
    }

    if args.system {
        print_system_info();
    }
    if args.defaults {
        print_default_config()?;
    }
    if !args.system && !args.defaults {
        print_system_info();
        println!();
        print_default_config()?;
    }

    Ok(())
}

fn print_system_info() {
    println!("=== 系统信息 ===");
    println!("AeroFuse CLI 版本: {}", env!("CARGO_PKG_VERSION"));
    println!("目标平台: {}", std::env::consts::ARCH);
    println!("操作系统: {}", std::env::consts::OS);
    println!("并行线程: {}", std::thread::available_parallelism().map_or(1, usize::from));
}

fn print_default_config() -> Result<()> {
    println!("=== 默认配置 ===");

    let config = PipelineConfig::default();
    let grid = ReferenceGrid::new(
        config.grid.lat_min,
        config.grid.lat_max,
        config.grid.lon_min,
        config.grid.lon_max,
        config.grid.resolution,
    )?;

    println!(
        "格网: lat [{}, {}], lon [{}, {}], 分辨率 {}° ({} × {} = {} 单元)",
        config.grid.lat_min,
        config.grid.lat_max,
        config.grid.lon_min,
        config.grid.lon_max,
        config.grid.resolution,
        grid.n_rows(),
        grid.n_cols(),
        grid.n_cells()
    );
    println!(
        "时间轴: {} .. {} ({:?})",
        config.time.start, config.time.end, config.time.granularity
    );
    println!(
        "匹配容差: {} m, {} s",
        config.matcher.max_distance_m, config.matcher.max_time_diff_secs
    );
    println!("特征列: {:?}", config.features.columns);
    println!("估计器: {}", config.model.estimator.family_name());
    println!("交叉验证: {} 折 (按站点)", config.cv.n_folds);

    println!("\n完整 JSON:");
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn list_models(dir: &PathBuf) -> Result<()> {
    println!("=== 已保存模型: {} ===", dir.display());
    let store = ModelStore::open(dir)?;
    let paths = store.list()?;
    if paths.is_empty() {
        println!("(空)");
        return Ok(());
    }
    for path in paths {
        let envelope = ModelStore::load(&path)?;
        println!(
            "{}  {}  {}  列 {:?}",
            envelope.id, envelope.family, envelope.created_at, envelope.schema
        );
    }
    Ok(())
}
