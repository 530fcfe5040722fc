//! 条件编译器
//!
//! 将 JSON 条件表达式解析为内存中的表达式树：校验操作符符号和表达式结构、
//! 限制嵌套深度、预编译正则，并提取表达式引用的字段。

use crate::error::{ConditionError, Result};
use crate::models::{
    ConditionExpression, ExpressionNode, FieldCondition, FieldTest, FormDefinition,
    LogicalGroup, OperatorTest,
};
use crate::operators::{LogicalOperator, Operator};
use serde_json::Value;
use std::collections::HashSet;

/// 默认最大嵌套深度
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// 编译后的条件表达式
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    /// 原始 JSON
    pub source: Value,
    pub expression: ConditionExpression,
    /// 表达式中引用的所有字段
    pub required_fields: HashSet<String>,
    /// 编译版本号（用于缓存失效）
    pub compile_version: u64,
}

impl CompiledExpression {
    pub fn root(&self) -> &ConditionExpression {
        &self.expression
    }
}

/// 编译后的字段规则
#[derive(Debug, Clone)]
pub struct CompiledField {
    pub name: String,
    pub visible_when: Option<ConditionExpression>,
    pub required_when: Option<ConditionExpression>,
    pub enabled_when: Option<ConditionExpression>,
}

/// 编译后的表单
#[derive(Debug, Clone)]
pub struct CompiledForm {
    pub form: FormDefinition,
    pub fields: Vec<CompiledField>,
    /// 所有字段规则引用的记录字段
    pub required_fields: HashSet<String>,
    pub compile_version: u64,
}

impl CompiledForm {
    pub fn id(&self) -> &str {
        &self.form.id
    }

    pub fn name(&self) -> &str {
        &self.form.name
    }
}

/// 条件编译器
pub struct ConditionCompiler {
    compile_version: u64,
    max_depth: usize,
}

impl ConditionCompiler {
    pub fn new() -> Self {
        Self {
            compile_version: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// 设置最大嵌套深度
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// 从 JSON 字符串编译条件表达式
    pub fn compile_from_json(&mut self, json: &str) -> Result<CompiledExpression> {
        let source: Value = serde_json::from_str(json)?;
        self.compile(source)
    }

    /// 编译条件表达式
    pub fn compile(&mut self, source: Value) -> Result<CompiledExpression> {
        let expression = self.parse(&source)?;
        let required_fields = Self::extract_fields(&expression);

        self.compile_version += 1;

        Ok(CompiledExpression {
            source,
            expression,
            required_fields,
            compile_version: self.compile_version,
        })
    }

    /// 解析条件表达式（不递增编译版本）
    pub fn parse(&self, value: &Value) -> Result<ConditionExpression> {
        self.parse_expression(value, "root", 1)
    }

    /// 从 JSON 字符串编译表单
    pub fn compile_form_from_json(&mut self, json: &str) -> Result<CompiledForm> {
        let form: FormDefinition = serde_json::from_str(json)?;
        self.compile_form(form)
    }

    /// 编译表单
    pub fn compile_form(&mut self, form: FormDefinition) -> Result<CompiledForm> {
        self.validate_form(&form)?;

        let mut fields = Vec::with_capacity(form.fields.len());
        let mut required_fields = HashSet::new();

        for (i, rule) in form.fields.iter().enumerate() {
            let base = format!("fields[{}]", i);
            let visible_when =
                self.parse_optional(rule.visible_when.as_ref(), &format!("{}.visible_when", base))?;
            let required_when = self
                .parse_optional(rule.required_when.as_ref(), &format!("{}.required_when", base))?;
            let enabled_when =
                self.parse_optional(rule.enabled_when.as_ref(), &format!("{}.enabled_when", base))?;

            for expr in [&visible_when, &required_when, &enabled_when]
                .into_iter()
                .flatten()
            {
                Self::collect_fields(expr, &mut required_fields);
            }

            fields.push(CompiledField {
                name: rule.name.clone(),
                visible_when,
                required_when,
                enabled_when,
            });
        }

        self.compile_version += 1;

        Ok(CompiledForm {
            form,
            fields,
            required_fields,
            compile_version: self.compile_version,
        })
    }

    /// 验证表单结构
    fn validate_form(&self, form: &FormDefinition) -> Result<()> {
        if form.id.is_empty() {
            return Err(ConditionError::ParseError("表单 ID 不能为空".to_string()));
        }

        if form.name.is_empty() {
            return Err(ConditionError::ParseError("表单名称不能为空".to_string()));
        }

        let mut seen = HashSet::new();
        for (i, field) in form.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(ConditionError::ParseError(format!(
                    "fields[{}] 的字段名不能为空",
                    i
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ConditionError::ParseError(format!(
                    "字段 '{}' 重复定义",
                    field.name
                )));
            }
        }

        Ok(())
    }

    fn parse_optional(
        &self,
        value: Option<&Value>,
        path: &str,
    ) -> Result<Option<ConditionExpression>> {
        let Some(value) = value else {
            return Ok(None);
        };

        // 表单规则是配置，结构无效时拒绝加载而不是静默为 false
        let expr = self.parse_expression(value, path, 1)?;
        if let Some((at, reason)) = expr.find_invalid() {
            return Err(ConditionError::InvalidExpression {
                path: at.to_string(),
                message: reason.to_string(),
            });
        }

        Ok(Some(expr))
    }

    /// 递归解析表达式
    ///
    /// 结构无效的部分解析为 `ExpressionNode::Invalid`，求值时为 false，
    /// 只有未知操作符和超出嵌套深度会返回错误。
    fn parse_expression(
        &self,
        value: &Value,
        path: &str,
        depth: usize,
    ) -> Result<ConditionExpression> {
        if depth > self.max_depth {
            return Err(ConditionError::ExpressionTooDeep {
                max_depth: self.max_depth,
                path: path.to_string(),
            });
        }

        let Some(map) = value.as_object() else {
            return Ok(ConditionExpression::new(vec![Self::invalid_node(
                path,
                "条件表达式必须是对象",
            )]));
        };

        let mut nodes = Vec::with_capacity(map.len());
        for (key, entry) in map {
            let node = match LogicalOperator::from_key(key) {
                Some(operator) => self.parse_group(operator, entry, path, depth)?,
                None => ExpressionNode::Condition(Self::parse_field(key, entry)?),
            };
            nodes.push(node);
        }

        Ok(ConditionExpression::new(nodes))
    }

    /// 解析逻辑组：单个对象视为只有一个元素的数组
    fn parse_group(
        &self,
        operator: LogicalOperator,
        value: &Value,
        path: &str,
        depth: usize,
    ) -> Result<ExpressionNode> {
        let children = match value {
            Value::Object(_) => {
                let child_path = format!("{}.{}", path, operator);
                vec![self.parse_expression(value, &child_path, depth + 1)?]
            }
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let child_path = format!("{}.{}[{}]", path, operator, i);
                    self.parse_expression(item, &child_path, depth + 1)
                })
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Ok(Self::invalid_node(
                    path,
                    format!("{} 的值必须是对象或数组", operator),
                ));
            }
        };

        Ok(ExpressionNode::Group(LogicalGroup::new(operator, children)))
    }

    /// 解析字段条件：对象为操作符映射，其他值为字面量
    fn parse_field(field: &str, value: &Value) -> Result<FieldCondition> {
        let test = match value {
            Value::Object(ops) => FieldTest::Operators(
                ops.iter()
                    .map(|(symbol, operand)| {
                        let operator = Operator::from_symbol(symbol)?;
                        Ok(OperatorTest::new(operator, operand.clone()))
                    })
                    .collect::<Result<Vec<_>>>()?,
            ),
            literal => FieldTest::Literal(literal.clone()),
        };

        Ok(FieldCondition {
            field: field.to_string(),
            test,
        })
    }

    fn invalid_node(path: &str, reason: impl Into<String>) -> ExpressionNode {
        ExpressionNode::Invalid {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    /// 提取表达式中使用的所有字段
    pub fn extract_fields(expr: &ConditionExpression) -> HashSet<String> {
        let mut fields = HashSet::new();
        Self::collect_fields(expr, &mut fields);
        fields
    }

    fn collect_fields(expr: &ConditionExpression, fields: &mut HashSet<String>) {
        for node in &expr.nodes {
            match node {
                ExpressionNode::Condition(cond) => {
                    fields.insert(cond.field.clone());
                }
                ExpressionNode::Group(group) => {
                    for child in &group.children {
                        Self::collect_fields(child, fields);
                    }
                }
                ExpressionNode::Invalid { .. } => {}
            }
        }
    }
}

impl Default for ConditionCompiler {
    fn default() -> Self {
        Self::new()
    }
}
