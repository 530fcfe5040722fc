//! 条件评估命令行工具
//!
//! 对记录求值条件表达式，或根据表单定义计算字段状态。

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use condition_engine::{ConditionCompiler, ConditionExecutor, FormEvaluator, FormStore, Record};
use formcond_shared::config::AppConfig;
use formcond_shared::observability::{self, metrics};
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const SERVICE_NAME: &str = "condition-eval";

#[derive(Parser)]
#[command(
    name = "condition-eval",
    version,
    about = "Evaluate form field conditions against records"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check whether a record satisfies a condition expression
    Check {
        /// Condition expression as inline JSON or @path
        #[arg(long)]
        expr: String,
        /// Record as inline JSON or @path
        #[arg(long)]
        record: String,
        /// Print the evaluation trace
        #[arg(long)]
        trace: bool,
    },
    /// Compute field states of a form for a record
    Form {
        #[arg(long)]
        form_id: String,
        /// Record as inline JSON or @path
        #[arg(long)]
        record: String,
        /// Directory of form definition files (defaults to forms.dir)
        #[arg(long)]
        forms_dir: Option<PathBuf>,
    },
    /// List the forms found in the forms directory
    List {
        #[arg(long)]
        forms_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig {
            service_name: SERVICE_NAME.to_string(),
            ..AppConfig::default()
        }
    });

    observability::init(&config.observability, &config.service_name)?;

    match cli.command {
        Command::Check {
            expr,
            record,
            trace,
        } => run_check(&config, &expr, &record, trace),
        Command::Form {
            form_id,
            record,
            forms_dir,
        } => run_form(&config, &form_id, &record, forms_dir),
        Command::List { forms_dir } => run_list(&config, forms_dir),
    }
}

fn run_check(config: &AppConfig, expr: &str, record: &str, trace: bool) -> Result<()> {
    let expr = read_json_arg(expr).context("invalid --expr")?;
    let record = Record::new(read_json_arg(record).context("invalid --record")?);

    let mut compiler = ConditionCompiler::new().with_max_depth(config.engine.max_depth);
    let compiled = match compiler.compile(expr) {
        Ok(compiled) => compiled,
        Err(e) => {
            metrics::record_condition_evaluation("error", 0.0);
            return Err(e.into());
        }
    };
    debug!(fields = ?compiled.required_fields, "expression compiled");

    let mut executor = ConditionExecutor::new();
    if trace || config.engine.trace_enabled {
        executor = executor.with_trace();
    }

    let result = executor.execute(&compiled, &record);
    metrics::record_condition_evaluation(
        if result.matched { "matched" } else { "not_matched" },
        result.evaluation_time_us as f64 / 1_000_000.0,
    );

    for line in &result.evaluation_trace {
        println!("{}", line);
    }
    println!("{}", result.matched);

    Ok(())
}

fn run_form(
    config: &AppConfig,
    form_id: &str,
    record: &str,
    forms_dir: Option<PathBuf>,
) -> Result<()> {
    let record = Record::new(read_json_arg(record).context("invalid --record")?);
    let store = load_store(config, forms_dir)?;

    let Some(form) = store.get(form_id) else {
        bail!("form '{}' not found", form_id);
    };

    let state = FormEvaluator::new().evaluate(&form, &record);
    let missing = state.missing_fields();
    metrics::record_form_evaluation(form_id, missing.len());

    if !missing.is_empty() {
        warn!(form_id = %form_id, missing = ?missing, "required fields are empty");
    }

    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(())
}

fn run_list(config: &AppConfig, forms_dir: Option<PathBuf>) -> Result<()> {
    let store = load_store(config, forms_dir)?;

    let mut forms = store.list_all();
    forms.sort_by(|a, b| a.id().cmp(b.id()));
    for form in forms {
        println!("{}\t{}\t{} fields", form.id(), form.name(), form.fields.len());
    }

    Ok(())
}

/// 加载表单目录
fn load_store(config: &AppConfig, forms_dir: Option<PathBuf>) -> Result<FormStore> {
    let dir = forms_dir.unwrap_or_else(|| PathBuf::from(&config.forms.dir));

    let store = FormStore::with_compiler(
        ConditionCompiler::new().with_max_depth(config.engine.max_depth),
    );
    let loaded = store
        .load_dir(&dir)
        .with_context(|| format!("failed to read forms directory {}", dir.display()))?;
    metrics::set_forms_loaded(store.len());

    let stats = store.stats();
    info!(
        dir = %dir.display(),
        forms = loaded.len(),
        fields = stats.total_fields,
        rules = stats.total_rules,
        "Forms loaded"
    );

    Ok(store)
}

/// 读取 JSON 参数：`@path` 从文件读取，否则按内联 JSON 解析
fn read_json_arg(arg: &str) -> Result<Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?
        }
        None => arg.to_string(),
    };

    Ok(serde_json::from_str(&text)?)
}
