//! 条件引擎领域模型

use crate::evaluator::ConditionEvaluator;
use crate::operators::{LogicalOperator, Operator};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 条件表达式（已解析）
///
/// 同一层级的多个子句之间是隐式 AND 关系，按编写顺序求值。
#[derive(Debug, Clone, Default)]
pub struct ConditionExpression {
    pub nodes: Vec<ExpressionNode>,
}

impl ConditionExpression {
    pub fn new(nodes: Vec<ExpressionNode>) -> Self {
        Self { nodes }
    }

    /// 查找第一个结构无效的节点，返回 (位置, 原因)
    pub fn find_invalid(&self) -> Option<(&str, &str)> {
        self.nodes.iter().find_map(|node| match node {
            ExpressionNode::Condition(_) => None,
            ExpressionNode::Group(group) => group.children.iter().find_map(|c| c.find_invalid()),
            ExpressionNode::Invalid { path, reason } => Some((path.as_str(), reason.as_str())),
        })
    }
}

/// 表达式节点（字段条件、逻辑组或无效结构）
#[derive(Debug, Clone)]
pub enum ExpressionNode {
    Condition(FieldCondition),
    Group(LogicalGroup),
    /// 结构无效的子表达式（如非对象的数组元素），求值恒为 false
    Invalid { path: String, reason: String },
}

/// 字段条件节点
#[derive(Debug, Clone)]
pub struct FieldCondition {
    pub field: String,
    pub test: FieldTest,
}

impl FieldCondition {
    pub fn literal(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            test: FieldTest::Literal(value.into()),
        }
    }

    pub fn operators(field: impl Into<String>, tests: Vec<OperatorTest>) -> Self {
        Self {
            field: field.into(),
            test: FieldTest::Operators(tests),
        }
    }
}

/// 字段测试：字面量（隐式严格相等）或操作符映射
#[derive(Debug, Clone)]
pub enum FieldTest {
    Literal(Value),
    /// 所有操作符都必须满足，空映射视为满足
    Operators(Vec<OperatorTest>),
}

/// 单个操作符测试
#[derive(Debug, Clone)]
pub struct OperatorTest {
    pub operator: Operator,
    pub operand: Value,
    /// `regex` 操作符的预编译正则
    pub pattern: Option<Regex>,
}

impl OperatorTest {
    pub fn new(operator: Operator, operand: impl Into<Value>) -> Self {
        let operand = operand.into();
        let pattern = match (operator, operand.as_str()) {
            (Operator::Regex, Some(p)) => Regex::new(p).ok(),
            _ => None,
        };
        Self {
            operator,
            operand,
            pattern,
        }
    }

    /// 对字段值执行测试
    pub fn test(&self, field_value: Option<&Value>) -> bool {
        match &self.pattern {
            Some(regex) => ConditionEvaluator::matches_regex(field_value, regex),
            None => ConditionEvaluator::evaluate(field_value, self.operator, &self.operand),
        }
    }
}

/// 逻辑组节点
#[derive(Debug, Clone)]
pub struct LogicalGroup {
    pub operator: LogicalOperator,
    pub children: Vec<ConditionExpression>,
}

impl LogicalGroup {
    pub fn new(operator: LogicalOperator, children: Vec<ConditionExpression>) -> Self {
        Self { operator, children }
    }

    pub fn and(children: Vec<ConditionExpression>) -> Self {
        Self::new(LogicalOperator::And, children)
    }

    pub fn or(children: Vec<ConditionExpression>) -> Self {
        Self::new(LogicalOperator::Or, children)
    }
}

/// 待评估的数据记录
#[derive(Debug, Clone, Default)]
pub struct Record {
    data: Value,
}

impl Record {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// 从 JSON 对象创建
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let data: Value = serde_json::from_str(json)?;
        Ok(Self { data })
    }

    /// 获取字段值
    ///
    /// 只按完整键名查找，`"a.b"` 不会进入嵌套对象。
    pub fn get_field(&self, key: &str) -> Option<&Value> {
        self.data.as_object()?.get(key)
    }

    /// 获取底层数据
    pub fn data(&self) -> &Value {
        &self.data
    }
}

impl From<Value> for Record {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

/// 评估结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationResult {
    pub matched: bool,
    pub matched_conditions: Vec<String>,
    pub evaluation_trace: Vec<String>,
    pub evaluation_time_us: u64,
}

/// 表单定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDefinition {
    pub id: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub fields: Vec<FieldRule>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl FormDefinition {
    pub fn new(name: impl Into<String>, fields: Vec<FieldRule>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            version: default_version(),
            fields,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

/// 字段规则：显示、必填、可编辑三类条件，均为可选的原始条件表达式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldRule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_when: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_when: Option<Value>,
}

impl FieldRule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn visible_when(mut self, expr: Value) -> Self {
        self.visible_when = Some(expr);
        self
    }

    pub fn required_when(mut self, expr: Value) -> Self {
        self.required_when = Some(expr);
        self
    }

    pub fn enabled_when(mut self, expr: Value) -> Self {
        self.enabled_when = Some(expr);
        self
    }
}

/// 单个字段的评估状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldState {
    pub name: String,
    pub visible: bool,
    pub required: bool,
    pub enabled: bool,
    /// 必填但记录中的值为空
    pub missing: bool,
}

/// 表单评估结果
#[derive(Debug, Clone, Serialize)]
pub struct FormState {
    pub form_id: String,
    pub fields: Vec<FieldState>,
}

impl FormState {
    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// 必填校验失败的字段名
    pub fn missing_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.missing)
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.fields.iter().all(|f| !f.missing)
    }
}
