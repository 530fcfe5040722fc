//! 条件引擎
//!
//! 对表单字段的显示/校验条件进行求值，支持：
//! - JSON 条件表达式解析（`AND` / `OR` 逻辑组、字段字面量、操作符映射）
//! - 严格与宽松比较、排序、集合成员、字符串与正则匹配、空值检查
//! - 表达式编译与缓存、短路求值和评估追踪
//! - 表单字段状态（显示、必填、可编辑）计算

pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod form;
pub mod models;
pub mod operators;
pub mod store;

pub use compiler::{CompiledExpression, CompiledField, CompiledForm, ConditionCompiler};
pub use error::{ConditionError, Result};
pub use evaluator::{ConditionEvaluator, is_empty};
pub use executor::ConditionExecutor;
pub use form::FormEvaluator;
pub use models::{
    ConditionExpression, EvaluationResult, ExpressionNode, FieldCondition, FieldRule,
    FieldState, FieldTest, FormDefinition, FormState, LogicalGroup, OperatorTest, Record,
};
pub use operators::{LogicalOperator, Operator};
pub use store::{FormStore, FormStoreStats};

use serde_json::Value;

/// 判断记录是否满足条件表达式
///
/// 先完整解析表达式再求值，所以即使某个分支会被短路跳过，
/// 其中的未知操作符也会返回 `UnknownOperator`。结构无效的子表达式
/// （如 `{"AND": [1]}`）不报错，求值为 false。
pub fn evaluate(record: &Record, expr: &Value) -> Result<bool> {
    let expression = ConditionCompiler::new().parse(expr)?;
    Ok(ConditionExecutor::new().matches(&expression, record))
}

/// 对单个值执行操作符，`operator` 为操作符符号（如 `"gte"`、`">="`）
pub fn evaluate_operator(
    operator: &str,
    record_value: Option<&Value>,
    operand: &Value,
) -> Result<bool> {
    ConditionEvaluator::evaluate_symbol(operator, record_value, operand)
}
