//! 比较操作符与逻辑操作符定义
//!
//! 操作符符号与别名集中在 [`SYMBOL_TABLE`] 中维护，解析和显示都以它为准。

use crate::error::{ConditionError, Result};
use std::fmt;
use std::str::FromStr;

/// 比较操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // 严格比较
    Eq,
    Ne,

    // 宽松比较（带类型转换）
    LooseEq,
    LooseNe,

    // 排序比较
    Gt,
    Gte,
    Lt,
    Lte,

    // 集合成员
    In,
    Nin,

    // 字符串操作
    Contains,
    StartsWith,
    EndsWith,
    Regex,

    // 空值检查
    Empty,
}

/// 符号 → 操作符 映射表，同一操作符的多个符号互为别名
pub const SYMBOL_TABLE: &[(&str, Operator)] = &[
    ("===", Operator::Eq),
    ("eq", Operator::Eq),
    ("!==", Operator::Ne),
    ("ne", Operator::Ne),
    ("==", Operator::LooseEq),
    ("!=", Operator::LooseNe),
    (">", Operator::Gt),
    ("gt", Operator::Gt),
    (">=", Operator::Gte),
    ("gte", Operator::Gte),
    ("<", Operator::Lt),
    ("lt", Operator::Lt),
    ("<=", Operator::Lte),
    ("lte", Operator::Lte),
    ("in", Operator::In),
    ("nin", Operator::Nin),
    ("contains", Operator::Contains),
    ("startsWith", Operator::StartsWith),
    ("endsWith", Operator::EndsWith),
    ("regex", Operator::Regex),
    ("empty", Operator::Empty),
];

impl Operator {
    /// 按符号查找操作符（区分大小写）
    pub fn from_symbol(symbol: &str) -> Result<Self> {
        SYMBOL_TABLE
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, op)| *op)
            .ok_or_else(|| ConditionError::UnknownOperator(symbol.to_string()))
    }

    /// 操作符的规范符号（表中第一个出现的符号）
    pub fn symbol(&self) -> &'static str {
        SYMBOL_TABLE
            .iter()
            .find(|(_, op)| op == self)
            .map(|(s, _)| *s)
            .unwrap_or("?")
    }

    /// 该操作符的所有符号
    pub fn aliases(&self) -> Vec<&'static str> {
        SYMBOL_TABLE
            .iter()
            .filter(|(_, op)| op == self)
            .map(|(s, _)| *s)
            .collect()
    }
}

impl FromStr for Operator {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_symbol(s)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// 逻辑操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    /// 表达式中的逻辑键（`AND` / `OR`），非逻辑键返回 None
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}
