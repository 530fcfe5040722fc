//! 条件执行器
//!
//! 对已解析的条件表达式进行短路求值。AND 遇到第一个 false 即返回，
//! OR 遇到第一个 true 即返回，因此不保证访问所有分支。

use crate::compiler::CompiledExpression;
use crate::evaluator::strict_eq;
use crate::models::{
    ConditionExpression, EvaluationResult, ExpressionNode, FieldCondition, FieldTest,
    LogicalGroup, Record,
};
use crate::operators::LogicalOperator;
use serde_json::Value;
use std::time::Instant;

static NULL: Value = Value::Null;

/// 条件执行器
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionExecutor {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl ConditionExecutor {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 执行评估并收集匹配条件与追踪信息
    pub fn execute(&self, compiled: &CompiledExpression, record: &Record) -> EvaluationResult {
        let start = Instant::now();

        let mut result = EvaluationResult::default();
        let matched = self.evaluate_expression(compiled.root(), record, Some(&mut result), "root");

        result.matched = matched;
        result.evaluation_time_us = start.elapsed().as_micros() as u64;

        result
    }

    /// 只返回是否匹配，不收集任何追踪信息
    pub fn matches(&self, expr: &ConditionExpression, record: &Record) -> bool {
        self.evaluate_expression(expr, record, None, "root")
    }

    /// 同一层级的节点按隐式 AND 组合
    fn evaluate_expression(
        &self,
        expr: &ConditionExpression,
        record: &Record,
        mut result: Option<&mut EvaluationResult>,
        path: &str,
    ) -> bool {
        for node in &expr.nodes {
            let matched = match node {
                ExpressionNode::Condition(cond) => {
                    self.evaluate_condition(cond, record, result.as_deref_mut(), path)
                }
                ExpressionNode::Group(group) => {
                    self.evaluate_group(group, record, result.as_deref_mut(), path)
                }
                ExpressionNode::Invalid { path: at, reason } => {
                    if self.trace_enabled {
                        if let Some(r) = result.as_deref_mut() {
                            r.evaluation_trace
                                .push(format!("{}: {} => NOT_MATCHED", at, reason));
                        }
                    }
                    false
                }
            };

            if !matched {
                return false;
            }
        }

        true
    }

    /// 评估字段条件节点
    fn evaluate_condition(
        &self,
        cond: &FieldCondition,
        record: &Record,
        result: Option<&mut EvaluationResult>,
        path: &str,
    ) -> bool {
        let field_value = record.get_field(&cond.field);

        let matched = match &cond.test {
            FieldTest::Literal(expected) => strict_eq(field_value.unwrap_or(&NULL), expected),
            FieldTest::Operators(tests) => tests.iter().all(|t| t.test(field_value)),
        };

        if let Some(result) = result {
            let description = Self::describe(cond);

            if self.trace_enabled {
                result.evaluation_trace.push(format!(
                    "{}: {} => {}",
                    path,
                    description,
                    if matched { "MATCHED" } else { "NOT_MATCHED" }
                ));
            }

            if matched {
                result
                    .matched_conditions
                    .push(format!("{}.{}", path, description));
            }
        }

        matched
    }

    /// 评估逻辑组节点（短路求值）
    fn evaluate_group(
        &self,
        group: &LogicalGroup,
        record: &Record,
        mut result: Option<&mut EvaluationResult>,
        path: &str,
    ) -> bool {
        let tracing = self.trace_enabled && result.is_some();

        if tracing {
            if let Some(r) = result.as_deref_mut() {
                r.evaluation_trace.push(format!(
                    "{}: 开始评估 {} 组 (共 {} 个子表达式)",
                    path,
                    group.operator,
                    group.children.len()
                ));
            }
        }

        // AND 遇到 false 短路，OR 遇到 true 短路
        let short_circuit_on = group.operator == LogicalOperator::Or;

        for (i, child) in group.children.iter().enumerate() {
            let child_path = if result.is_some() {
                format!("{}.{}[{}]", path, group.operator, i)
            } else {
                String::new()
            };

            let child_matched =
                self.evaluate_expression(child, record, result.as_deref_mut(), &child_path);

            if child_matched == short_circuit_on {
                if tracing {
                    if let Some(r) = result.as_deref_mut() {
                        r.evaluation_trace.push(format!(
                            "{}: {} 短路 - 子表达式 {} {}",
                            path,
                            group.operator,
                            i,
                            if child_matched { "匹配" } else { "不匹配" }
                        ));
                    }
                }
                return short_circuit_on;
            }
        }

        if tracing {
            if let Some(r) = result.as_deref_mut() {
                let summary = match group.operator {
                    LogicalOperator::And => "AND 组全部匹配",
                    LogicalOperator::Or => "OR 组无匹配",
                };
                r.evaluation_trace.push(format!("{}: {}", path, summary));
            }
        }

        // 空 AND 为 true，空 OR 为 false
        !short_circuit_on
    }

    fn describe(cond: &FieldCondition) -> String {
        match &cond.test {
            FieldTest::Literal(expected) => format!("{} === {}", cond.field, expected),
            FieldTest::Operators(tests) => {
                let parts: Vec<String> = tests
                    .iter()
                    .map(|t| format!("{} {}", t.operator, t.operand))
                    .collect();
                format!("{} {{{}}}", cond.field, parts.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::ConditionCompiler;
    use serde_json::json;

    fn create_test_record() -> Record {
        Record::new(json!({
            "status": "active",
            "role": "owner",
            "age": 17,
            "tags": ["vip", "frequent"],
            "profile": { "country": "FR" }
        }))
    }

    fn compile(expr: Value) -> CompiledExpression {
        let mut compiler = ConditionCompiler::new();
        compiler.compile(expr).unwrap()
    }

    fn check(expr: Value, record: &Record) -> bool {
        ConditionExecutor::new().matches(compile(expr).root(), record)
    }

    #[test]
    fn test_literal_condition_match() {
        let expr = compile(json!({ "status": "active" }));
        let result = ConditionExecutor::new().execute(&expr, &create_test_record());

        assert!(result.matched);
        assert_eq!(result.matched_conditions.len(), 1);
    }

    #[test]
    fn test_literal_condition_not_match() {
        let expr = compile(json!({ "status": "archived" }));
        let result = ConditionExecutor::new().execute(&expr, &create_test_record());

        assert!(!result.matched);
        assert!(result.matched_conditions.is_empty());
    }

    #[test]
    fn test_sibling_keys_are_and_combined() {
        let record = create_test_record();
        assert!(check(json!({ "status": "active", "role": "owner" }), &record));
        assert!(!check(json!({ "status": "active", "role": "admin" }), &record));
    }

    #[test]
    fn test_and_short_circuit() {
        let expr = compile(json!({
            "AND": [ { "status": "archived" }, { "age": { "gte": 10 } } ]
        }));
        let result = ConditionExecutor::new()
            .with_trace()
            .execute(&expr, &create_test_record());

        assert!(!result.matched);
        assert!(result.evaluation_trace.iter().any(|t| t.contains("短路")));
        // 第二个子表达式未被评估
        assert!(!result.evaluation_trace.iter().any(|t| t.contains("age")));
    }

    #[test]
    fn test_or_short_circuit() {
        let expr = compile(json!({
            "OR": [ { "status": "active" }, { "status": "archived" } ]
        }));
        let result = ConditionExecutor::new()
            .with_trace()
            .execute(&expr, &create_test_record());

        assert!(result.matched);
        assert!(result.evaluation_trace.iter().any(|t| t.contains("OR 短路")));
        assert_eq!(result.matched_conditions.len(), 1);
    }

    #[test]
    fn test_empty_groups() {
        let record = create_test_record();
        assert!(check(json!({ "AND": [] }), &record));
        assert!(!check(json!({ "OR": [] }), &record));
        assert!(check(json!({}), &record));
    }

    #[test]
    fn test_nested_groups() {
        let expr = compile(json!({
            "AND": [
                { "status": "active" },
                { "OR": [ { "role": { "in": ["admin", "owner"] } }, { "age": { "gte": 18 } } ] }
            ]
        }));
        let result = ConditionExecutor::new().execute(&expr, &create_test_record());

        // role 匹配，即使 age 不满足
        assert!(result.matched);
        assert_eq!(result.matched_conditions.len(), 2);
        assert!(result.matched_conditions[1].starts_with("root.AND[1].OR[0]"));
    }

    #[test]
    fn test_operator_mapping_requires_all() {
        let record = create_test_record();
        assert!(check(json!({ "age": { "gte": 10, "lte": 20 } }), &record));
        assert!(!check(json!({ "age": { "gte": 10, "lte": 16 } }), &record));
        assert!(check(json!({ "age": {} }), &record));
    }

    #[test]
    fn test_dotted_key_is_a_plain_key() {
        let record = Record::new(json!({ "a": { "b": "x" } }));
        assert!(check(json!({ "a.b": { "empty": true } }), &record));
        assert!(!check(json!({ "a.b": "x" }), &record));

        let flat = Record::new(json!({ "a.b": "x" }));
        assert!(check(json!({ "a.b": "x" }), &flat));
    }

    #[test]
    fn test_invalid_nodes_never_match() {
        let record = create_test_record();
        assert!(!check(json!({ "AND": [1] }), &record));
        assert!(!check(json!({ "OR": "x" }), &record));
        assert!(!check(json!([1]), &record));
        assert!(!check(json!({ "AND": true }), &record));
        // OR 中的其他分支仍可匹配
        assert!(check(json!({ "OR": [1, { "status": "active" }] }), &record));
    }

    #[test]
    fn test_invalid_node_in_trace() {
        let expr = compile(json!({ "AND": [1] }));
        let result = ConditionExecutor::new()
            .with_trace()
            .execute(&expr, &create_test_record());

        assert!(!result.matched);
        assert!(
            result
                .evaluation_trace
                .iter()
                .any(|t| t.starts_with("root.AND[0]:") && t.ends_with("NOT_MATCHED"))
        );
    }

    #[test]
    fn test_missing_field() {
        let record = create_test_record();
        assert!(!check(json!({ "email": "a@b.c" }), &record));
        assert!(check(json!({ "email": null }), &record));
        assert!(check(json!({ "email": { "empty": true } }), &record));
    }

    #[test]
    fn test_trace_output() {
        let expr = compile(json!({ "status": "active" }));
        let result = ConditionExecutor::new()
            .with_trace()
            .execute(&expr, &create_test_record());

        assert_eq!(result.evaluation_trace.len(), 1);
        assert!(result.evaluation_trace[0].contains("MATCHED"));
        assert!(result.evaluation_trace[0].contains("status === \"active\""));
    }

    #[test]
    fn test_no_trace_without_flag() {
        let expr = compile(json!({ "OR": [ { "status": "active" } ] }));
        let result = ConditionExecutor::new().execute(&expr, &create_test_record());

        assert!(result.matched);
        assert!(result.evaluation_trace.is_empty());
    }
}
