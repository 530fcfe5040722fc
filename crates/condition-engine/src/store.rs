//! 表单规则存储
//!
//! 使用 DashMap 提供线程安全的表单缓存，支持表单的加载、更新、删除和批量操作。
//! 缓存中的编译结果加载后只读，评估时无需加锁。

use crate::compiler::{CompiledForm, ConditionCompiler};
use crate::error::{ConditionError, Result};
use crate::models::FormDefinition;
use dashmap::DashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// 表单存储
#[derive(Clone)]
pub struct FormStore {
    /// 编译后的表单缓存
    forms: Arc<DashMap<String, CompiledForm>>,
    /// 条件编译器
    compiler: Arc<parking_lot::Mutex<ConditionCompiler>>,
}

impl FormStore {
    pub fn new() -> Self {
        Self::with_compiler(ConditionCompiler::new())
    }

    /// 使用指定编译器（如自定义最大深度）创建存储
    pub fn with_compiler(compiler: ConditionCompiler) -> Self {
        Self {
            forms: Arc::new(DashMap::new()),
            compiler: Arc::new(parking_lot::Mutex::new(compiler)),
        }
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    /// 加载表单
    #[instrument(skip(self, form), fields(form_id = %form.id, form_name = %form.name))]
    pub fn load(&self, form: FormDefinition) -> Result<()> {
        let compiled = {
            let mut compiler = self.compiler.lock();
            compiler.compile_form(form)?
        };

        let form_id = compiled.id().to_string();
        self.forms.insert(form_id.clone(), compiled);

        info!("表单已加载: {}", form_id);
        Ok(())
    }

    /// 从 JSON 字符串加载表单
    #[instrument(skip(self, json))]
    pub fn load_from_json(&self, json: &str) -> Result<String> {
        let compiled = {
            let mut compiler = self.compiler.lock();
            compiler.compile_form_from_json(json)?
        };

        let form_id = compiled.id().to_string();
        self.forms.insert(form_id.clone(), compiled);

        info!("表单已加载: {}", form_id);
        Ok(form_id)
    }

    /// 加载目录下所有 `.json` 表单文件，单个文件失败不影响其他文件
    #[instrument(skip(self, dir), fields(forms_dir = %dir.as_ref().display()))]
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<Vec<String>> {
        let mut paths: Vec<_> = std::fs::read_dir(dir.as_ref())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut loaded_ids = Vec::with_capacity(paths.len());
        let mut failed = 0usize;

        for path in paths {
            let outcome = std::fs::read_to_string(&path)
                .map_err(ConditionError::from)
                .and_then(|json| self.load_from_json(&json));

            match outcome {
                Ok(form_id) => {
                    debug!(path = %path.display(), form_id = %form_id, "form file loaded");
                    loaded_ids.push(form_id);
                }
                Err(e) => {
                    failed += 1;
                    warn!(path = %path.display(), error = %e, "表单文件加载失败");
                }
            }
        }

        info!("目录加载完成: {} 成功, {} 失败", loaded_ids.len(), failed);
        Ok(loaded_ids)
    }

    /// 更新表单
    #[instrument(skip(self, form), fields(form_id = %form.id))]
    pub fn update(&self, form: FormDefinition) -> Result<()> {
        let form_id = form.id.clone();

        if !self.forms.contains_key(&form_id) {
            warn!("更新不存在的表单: {}", form_id);
            return Err(ConditionError::FormNotFound(form_id));
        }

        self.load(form)
    }

    /// 删除表单
    #[instrument(skip(self))]
    pub fn delete(&self, form_id: &str) -> Result<()> {
        if self.forms.remove(form_id).is_some() {
            info!("表单已删除: {}", form_id);
            Ok(())
        } else {
            warn!("删除不存在的表单: {}", form_id);
            Err(ConditionError::FormNotFound(form_id.to_string()))
        }
    }

    pub fn get(&self, form_id: &str) -> Option<CompiledForm> {
        self.forms.get(form_id).map(|f| f.clone())
    }

    pub fn contains(&self, form_id: &str) -> bool {
        self.forms.contains_key(form_id)
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.forms.iter().map(|f| f.key().clone()).collect()
    }

    pub fn list_all(&self) -> Vec<CompiledForm> {
        self.forms.iter().map(|f| f.value().clone()).collect()
    }

    /// 批量加载表单
    #[instrument(skip(self, forms))]
    pub fn load_batch(&self, forms: Vec<FormDefinition>) -> Result<Vec<String>> {
        let mut loaded_ids = Vec::with_capacity(forms.len());
        let mut errors = Vec::new();

        for form in forms {
            let form_id = form.id.clone();
            match self.load(form) {
                Ok(()) => loaded_ids.push(form_id),
                Err(e) => errors.push((form_id, e)),
            }
        }

        if !errors.is_empty() {
            warn!("批量加载部分失败: {:?}", errors);
        }

        info!("批量加载完成: {} 成功, {} 失败", loaded_ids.len(), errors.len());
        Ok(loaded_ids)
    }

    /// 清空所有表单
    #[instrument(skip(self))]
    pub fn clear(&self) {
        let count = self.forms.len();
        self.forms.clear();
        info!("已清空 {} 个表单", count);
    }

    /// 获取存储统计信息
    pub fn stats(&self) -> FormStoreStats {
        let forms_count = self.forms.len();
        let (total_fields, total_rules) = self.forms.iter().fold((0, 0), |(fields, rules), f| {
            let rule_count: usize = f
                .fields
                .iter()
                .map(|field| {
                    [
                        field.visible_when.is_some(),
                        field.required_when.is_some(),
                        field.enabled_when.is_some(),
                    ]
                    .into_iter()
                    .filter(|present| *present)
                    .count()
                })
                .sum();
            (fields + f.fields.len(), rules + rule_count)
        });

        FormStoreStats {
            forms_count,
            total_fields,
            total_rules,
        }
    }
}

impl Default for FormStore {
    fn default() -> Self {
        Self::new()
    }
}

/// 表单存储统计信息
#[derive(Debug, Clone)]
pub struct FormStoreStats {
    pub forms_count: usize,
    /// 所有表单的字段总数
    pub total_fields: usize,
    /// 已配置的条件规则总数
    pub total_rules: usize,
}
