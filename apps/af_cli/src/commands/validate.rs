// apps/af_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 验证管线配置文件的正确性，并对可疑取值给出警告。

use af_config::PipelineConfig;
use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    #[arg(short, long)]
    pub config: PathBuf,

    /// 严格模式（警告也视为错误）
    #[arg(long)]
    pub strict: bool,
}

/// 验证结果
#[derive(Default)]
struct ValidationResult {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl ValidationResult {
    fn add_error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn add_warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn is_ok(&self, strict: bool) -> bool {
        self.errors.is_empty() && (!strict || self.warnings.is_empty())
    }
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== AeroFuse 配置验证 ===");
    println!("检查配置文件: {}", args.config.display());

    let mut result = ValidationResult::default();

    if !args.config.exists() {
        bail!("配置文件不存在: {}", args.config.display());
    }
    let text = std::fs::read_to_string(&args.config).context("无法读取配置文件")?;

    // 结构性校验由配置层完成
    let config: PipelineConfig = match serde_json::from_str(&text) {
        Ok(c) => c,
        Err(e) => {
            result.add_error(format!("JSON 解析错误: {e}"));
            return print_result(&result, args.strict);
        }
    };
    if let Err(e) = config.validate() {
        result.add_error(e.to_string());
        return print_result(&result, args.strict);
    }
    println!("  ✓ 配置格式有效");

    check_plausibility(&config, &mut result);
    print_result(&result, args.strict)
}

/// 合法但可疑的取值
fn check_plausibility(config: &PipelineConfig, result: &mut ValidationResult) {
    let n_rows = ((config.grid.lat_max - config.grid.lat_min) / config.grid.resolution).ceil();
    let n_cols = ((config.grid.lon_max - config.grid.lon_min) / config.grid.resolution).ceil();
    let n_cells = n_rows * n_cols;
    if n_cells > 1e6 {
        result.add_warning(format!("格网单元数约 {n_cells:.0}，运行可能很慢"));
    }

    if config.grid.resolution > 5.0 {
        result.add_warning(format!(
            "分辨率 {}° 很粗，预测面可能没有意义",
            config.grid.resolution
        ));
    }

    if config.matcher.max_distance_m > 200_000.0 {
        result.add_warning(format!(
            "匹配距离容差 {} m 过大，远站观测会被关联到不相关单元",
            config.matcher.max_distance_m
        ));
    }

    let step_secs = config.time.granularity.step().num_seconds();
    if config.matcher.max_time_diff_secs > step_secs {
        result.add_warning(format!(
            "时间容差 {} s 超过时间步长 {} s，相邻槽的观测会互相竞争",
            config.matcher.max_time_diff_secs, step_secs
        ));
    }

    if config.model.min_training_rows < 10 {
        result.add_warning(format!(
            "min_training_rows = {} 过低，指标几乎没有统计意义",
            config.model.min_training_rows
        ));
    }
}

fn print_result(result: &ValidationResult, strict: bool) -> Result<()> {
    println!("\n=== 验证结果 ===");

    if !result.errors.is_empty() {
        println!("\n错误 ({}):", result.errors.len());
        for err in &result.errors {
            error!("  ✗ {}", err);
            println!("  ✗ {err}");
        }
    }

    if !result.warnings.is_empty() {
        println!("\n警告 ({}):", result.warnings.len());
        for warning in &result.warnings {
            warn!("  ⚠ {}", warning);
            println!("  ⚠ {warning}");
        }
    }

    if result.is_ok(strict) {
        println!("\n✓ 验证通过");
        Ok(())
    } else {
        println!("\n✗ 验证失败");
        bail!(
            "验证失败：发现 {} 个错误，{} 个警告",
            result.errors.len(),
            result.warnings.len()
        )
    }
}
