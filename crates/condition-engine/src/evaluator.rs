//! 操作符评估器
//!
//! 对单个字段值执行比较操作符。除未知操作符外，所有输入组合都返回布尔值：
//! 类型不匹配一律按"条件不满足"处理，不会返回错误。
//!
//! 排序操作符使用跨类型的全序：
//! `null < boolean < number < string < array < object`，
//! 同类型内按自然顺序比较（数组逐元素、对象按排序后的键值对）。
//! 字段不存在时排序比较总是返回 false。

use crate::error::Result;
use crate::operators::Operator;
use regex::Regex;
use serde_json::{Number, Value};
use std::cmp::Ordering;

static NULL: Value = Value::Null;

/// 操作符评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 按操作符符号评估，符号不在操作符表中时返回 `UnknownOperator`
    pub fn evaluate_symbol(
        symbol: &str,
        field_value: Option<&Value>,
        operand: &Value,
    ) -> Result<bool> {
        let operator = Operator::from_symbol(symbol)?;
        Ok(Self::evaluate(field_value, operator, operand))
    }

    /// 评估操作符
    ///
    /// # Arguments
    /// * `field_value` - 记录中的字段值，`None` 表示字段不存在
    /// * `operator` - 操作符
    /// * `operand` - 条件中定义的操作数
    pub fn evaluate(field_value: Option<&Value>, operator: Operator, operand: &Value) -> bool {
        match operator {
            Operator::Eq => strict_eq(field_value.unwrap_or(&NULL), operand),
            Operator::Ne => !strict_eq(field_value.unwrap_or(&NULL), operand),
            Operator::LooseEq => loose_eq(field_value.unwrap_or(&NULL), operand),
            Operator::LooseNe => !loose_eq(field_value.unwrap_or(&NULL), operand),
            Operator::Gt => Self::order(field_value, operand, Ordering::is_gt),
            Operator::Gte => Self::order(field_value, operand, Ordering::is_ge),
            Operator::Lt => Self::order(field_value, operand, Ordering::is_lt),
            Operator::Lte => Self::order(field_value, operand, Ordering::is_le),
            Operator::In => Self::in_list(field_value, operand).unwrap_or(false),
            Operator::Nin => Self::in_list(field_value, operand).map_or(true, |found| !found),
            Operator::Contains => Self::string_test(field_value, operand, |s, p| s.contains(p)),
            Operator::StartsWith => {
                Self::string_test(field_value, operand, |s, p| s.starts_with(p))
            }
            Operator::EndsWith => Self::string_test(field_value, operand, |s, p| s.ends_with(p)),
            Operator::Regex => Self::regex_match(field_value, operand),
            Operator::Empty => {
                if operand.as_bool() == Some(false) {
                    !is_empty(field_value)
                } else {
                    is_empty(field_value)
                }
            }
        }
    }

    /// 使用预编译的正则表达式匹配字段值
    pub fn matches_regex(field_value: Option<&Value>, regex: &Regex) -> bool {
        match field_value {
            Some(Value::String(s)) => regex.is_match(s),
            _ => false,
        }
    }

    fn order<F>(field_value: Option<&Value>, operand: &Value, accept: F) -> bool
    where
        F: Fn(Ordering) -> bool,
    {
        match field_value {
            Some(value) => accept(compare_values(value, operand)),
            None => false,
        }
    }

    /// 列表成员检查，操作数不是数组时返回 None
    fn in_list(field_value: Option<&Value>, operand: &Value) -> Option<bool> {
        let items = operand.as_array()?;
        let value = field_value.unwrap_or(&NULL);
        Some(items.iter().any(|item| strict_eq(value, item)))
    }

    fn string_test<F>(field_value: Option<&Value>, operand: &Value, test: F) -> bool
    where
        F: Fn(&str, &str) -> bool,
    {
        match (field_value, operand) {
            (Some(Value::String(s)), Value::String(p)) => test(s, p),
            _ => false,
        }
    }

    fn regex_match(field_value: Option<&Value>, operand: &Value) -> bool {
        let Some(pattern) = operand.as_str() else {
            return false;
        };
        match Regex::new(pattern) {
            Ok(regex) => Self::matches_regex(field_value, &regex),
            Err(_) => false,
        }
    }
}

/// 判断值是否为空
///
/// 不存在/null、去除首尾空白后为空的字符串、空数组、空对象视为空；
/// 数字和布尔值永远不为空。
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(arr)) => arr.is_empty(),
        Some(Value::Object(obj)) => obj.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => false,
    }
}

/// 严格相等：类型和值都必须一致，数字按数值比较，数组和对象按结构比较
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Ordering::Equal,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| strict_eq(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| strict_eq(v, other)))
        }
        _ => a == b,
    }
}

/// 宽松相等（兼容旧规则的 `==` / `!=`）
///
/// 类型转换规则：
/// - null 只与 null 相等
/// - 布尔值先转为数字 1 / 0
/// - 数字与字符串比较时，字符串去除空白后解析为数字（空串为 0）
/// - 数组与基本类型比较时，数组先转为逗号连接的字符串
/// - 对象不与任何基本类型相等
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    if strict_eq(a, b) {
        return true;
    }

    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(x), other) => loose_eq(&Value::from(u8::from(*x)), other),
        (other, Value::Bool(y)) => loose_eq(other, &Value::from(u8::from(*y))),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            match (parse_number(s), n.as_f64()) {
                (Some(parsed), Some(num)) => parsed == num,
                _ => false,
            }
        }
        (Value::Array(arr), other @ (Value::String(_) | Value::Number(_)))
        | (other @ (Value::String(_) | Value::Number(_)), Value::Array(arr)) => {
            loose_eq(&Value::String(join_array(arr)), other)
        }
        _ => false,
    }
}

/// 跨类型全序比较
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }

    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y)
            .map(|(l, r)| compare_values(l, r))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(x), Value::Object(y)) => {
            let mut left: Vec<_> = x.iter().collect();
            let mut right: Vec<_> = y.iter().collect();
            left.sort_by(|l, r| l.0.cmp(r.0));
            right.sort_by(|l, r| l.0.cmp(r.0));
            left.iter()
                .zip(&right)
                .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| compare_values(lv, rv)))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| left.len().cmp(&right.len()))
        }
        _ => Ordering::Equal,
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a.cmp(&b);
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a.cmp(&b);
    }
    match (x.as_f64(), y.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => Ordering::Equal,
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn join_array(arr: &[Value]) -> String {
    arr.iter()
        .map(|item| match item {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Array(inner) => join_array(inner),
            Value::Object(_) => "[object Object]".to_string(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",")
}
