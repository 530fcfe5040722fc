//! 表单字段状态评估
//!
//! 根据字段规则计算每个字段的显示、必填、可编辑状态，并做必填校验。

use crate::compiler::{CompiledField, CompiledForm};
use crate::evaluator::is_empty;
use crate::executor::ConditionExecutor;
use crate::models::{ConditionExpression, FieldState, FormState, Record};

/// 表单评估器
#[derive(Debug, Clone, Copy, Default)]
pub struct FormEvaluator {
    executor: ConditionExecutor,
}

impl FormEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 评估表单中每个字段的状态
    pub fn evaluate(&self, form: &CompiledForm, record: &Record) -> FormState {
        FormState {
            form_id: form.id().to_string(),
            fields: form
                .fields
                .iter()
                .map(|field| self.evaluate_field(field, record))
                .collect(),
        }
    }

    /// 未配置的规则取默认值：显示、非必填、可编辑；隐藏字段永远不是必填
    fn evaluate_field(&self, field: &CompiledField, record: &Record) -> FieldState {
        let visible = self.check(field.visible_when.as_ref(), record, true);
        let required = visible && self.check(field.required_when.as_ref(), record, false);
        let enabled = self.check(field.enabled_when.as_ref(), record, true);
        let missing = required && is_empty(record.get_field(&field.name));

        FieldState {
            name: field.name.clone(),
            visible,
            required,
            enabled,
            missing,
        }
    }

    fn check(&self, expr: Option<&ConditionExpression>, record: &Record, default: bool) -> bool {
        expr.map_or(default, |e| self.executor.matches(e, record))
    }
}
