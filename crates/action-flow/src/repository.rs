//! Workflow and form loaders with in-process caches

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::command::Command;
use crate::compiler::compile;
use crate::errors::FlowError;
use crate::form::FormConfiguration;

/// Compiled workflows by name
#[async_trait]
pub trait WorkflowSource: Send + Sync {
    async fn get_workflow(&self, name: &str) -> Result<Arc<Command>, FlowError>;
}

/// Form definitions by id
#[async_trait]
pub trait FormSource: Send + Sync {
    async fn get_form(&self, form_id: &str) -> Result<Arc<FormConfiguration>, FlowError>;
}

/// Names map straight to file names, so anything that could escape the directory is
/// rejected as unknown.
fn validate_name(kind: &str, name: &str) -> Result<(), FlowError> {
    if name.trim().is_empty() || name.contains(['/', '\\']) || name.contains("..") {
        return Err(FlowError::NotFound(format!("{kind} '{name}'")));
    }
    Ok(())
}

async fn read_definition(kind: &str, name: &str, path: &Path) -> Result<String, FlowError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(FlowError::NotFound(format!(
            "{kind} '{name}' ({})",
            path.display()
        ))),
        Err(err) => Err(FlowError::Io(format!("{}: {err}", path.display()))),
    }
}

/// `{dir}/{name}.json` workflows, compiled once and cached.
pub struct FileWorkflowRepository {
    dir: PathBuf,
    cache: DashMap<String, Arc<Command>>,
}

impl FileWorkflowRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: DashMap::new(),
        }
    }

    #[cfg(test)]
    fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl WorkflowSource for FileWorkflowRepository {
    async fn get_workflow(&self, name: &str) -> Result<Arc<Command>, FlowError> {
        if let Some(hit) = self.cache.get(name) {
            return Ok(Arc::clone(hit.value()));
        }
        validate_name("workflow", name)?;

        let path = self.dir.join(format!("{name}.json"));
        let text = read_definition("workflow", name, &path).await?;
        if text.trim().is_empty() {
            return Err(FlowError::MalformedWorkflow(format!(
                "workflow '{name}' is empty"
            )));
        }
        let command = compile(&text)?;
        info!(workflow = %name, nodes = command.node_count(), "workflow compiled");

        // A concurrent load may have raced us; keep whichever landed first.
        let entry = self
            .cache
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(command));
        Ok(Arc::clone(entry.value()))
    }
}

/// `{dir}/{formId}.json` form definitions, parsed once and cached.
pub struct FileFormRepository {
    dir: PathBuf,
    cache: DashMap<String, Arc<FormConfiguration>>,
}

impl FileFormRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: DashMap::new(),
        }
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[async_trait]
impl FormSource for FileFormRepository {
    async fn get_form(&self, form_id: &str) -> Result<Arc<FormConfiguration>, FlowError> {
        if let Some(hit) = self.cache.get(form_id) {
            return Ok(Arc::clone(hit.value()));
        }
        validate_name("form", form_id)?;

        let path = self.dir.join(format!("{form_id}.json"));
        let text = read_definition("form", form_id, &path).await?;
        let form = FormConfiguration::from_json(&text)?;
        debug!(form = %form_id, fields = form.fields.len(), "form loaded");

        let entry = self
            .cache
            .entry(form_id.to_string())
            .or_insert_with(|| Arc::new(form));
        Ok(Arc::clone(entry.value()))
    }
}

/// Fixed workflows held in memory.
#[derive(Default)]
pub struct MemoryWorkflows {
    workflows: HashMap<String, Arc<Command>>,
}

impl MemoryWorkflows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, command: Command) -> Self {
        self.workflows.insert(name.into(), Arc::new(command));
        self
    }
}

#[async_trait]
impl WorkflowSource for MemoryWorkflows {
    async fn get_workflow(&self, name: &str) -> Result<Arc<Command>, FlowError> {
        self.workflows
            .get(name)
            .cloned()
            .ok_or_else(|| FlowError::NotFound(format!("workflow '{name}'")))
    }
}

/// Fixed forms held in memory.
#[derive(Default)]
pub struct MemoryForms {
    forms: HashMap<String, Arc<FormConfiguration>>,
}

impl MemoryForms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, form: FormConfiguration) -> Self {
        self.forms.insert(form.form_id.clone(), Arc::new(form));
        self
    }
}

#[async_trait]
impl FormSource for MemoryForms {
    async fn get_form(&self, form_id: &str) -> Result<Arc<FormConfiguration>, FlowError> {
        self.forms
            .get(form_id)
            .cloned()
            .ok_or_else(|| FlowError::NotFound(format!("form '{form_id}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn loads_and_caches_workflows() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("pracuj.json"),
            r#"{"type":"exit","success":true}"#,
        )
        .unwrap();
        let repo = FileWorkflowRepository::new(dir.path());

        let first = repo.get_workflow("pracuj").await.unwrap();
        fs::remove_file(dir.path().join("pracuj.json")).unwrap();
        let second = repo.get_workflow("pracuj").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(repo.cached(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_loads_agree() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("indeed.json"),
            r#"{"type":"sequence","commands":[{"type":"exit","success":false}]}"#,
        )
        .unwrap();
        let repo = Arc::new(FileWorkflowRepository::new(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move { repo.get_workflow("indeed").await.unwrap() })
            })
            .collect();
        let mut loaded = Vec::new();
        for handle in handles {
            loaded.push(handle.await.unwrap());
        }
        assert!(loaded.iter().all(|cmd| **cmd == *loaded[0]));
        assert_eq!(repo.cached(), 1);
    }

    #[tokio::test]
    async fn missing_and_invalid_names_are_not_found() {
        let dir = tempdir().unwrap();
        let repo = FileWorkflowRepository::new(dir.path());
        for name in ["absent", "../etc/passwd", "a/b", ""] {
            let err = repo.get_workflow(name).await.unwrap_err();
            assert!(matches!(err, FlowError::NotFound(_)), "{name}: {err:?}");
        }
    }

    #[tokio::test]
    async fn empty_and_broken_workflows_are_malformed() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("empty.json"), "  \n").unwrap();
        fs::write(dir.path().join("broken.json"), r#"{"type":"click"}"#).unwrap();
        let repo = FileWorkflowRepository::new(dir.path());

        assert!(matches!(
            repo.get_workflow("empty").await,
            Err(FlowError::MalformedWorkflow(_))
        ));
        assert!(matches!(
            repo.get_workflow("broken").await,
            Err(FlowError::MalformedWorkflow(_))
        ));
        assert_eq!(repo.cached(), 0);
    }

    #[tokio::test]
    async fn loads_forms() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("apply.json"),
            r##"{"formId":"apply","formName":"Apply","fields":[{"fieldName":"cv","selector":"#cv","dataValue":"${ResumePath}","fieldType":"file"}]}"##,
        )
        .unwrap();
        let repo = FileFormRepository::new(dir.path());

        let form = repo.get_form("apply").await.unwrap();
        assert_eq!(form.fields[0].selector, "#cv");
        assert!(matches!(
            repo.get_form("other").await,
            Err(FlowError::NotFound(_))
        ));
    }
}
