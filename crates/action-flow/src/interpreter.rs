//! Command tree interpreter
//!
//! Walks a compiled [`Command`] tree against one page. Nodes run strictly in order;
//! every node reports whether the run terminated so enclosing sequences can stop.

use action_primitives::{AutomationDriver, DriverError};
use async_recursion::async_recursion;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::command::{Command, Flow, PostClickWait};
use crate::context::{
    ExecutionContext, CONDITION_RESULT, WORKFLOW_FINISHED_MESSAGE, WORKFLOW_FINISHED_SUCCESSFULLY,
};
use crate::errors::FlowError;
use crate::form::{parse_checkbox, FieldConfig, FieldType};
use crate::interpolate::interpolate;
use crate::repository::FormSource;

pub struct Interpreter {
    forms: Arc<dyn FormSource>,
}

impl Interpreter {
    pub fn new(forms: Arc<dyn FormSource>) -> Self {
        Self { forms }
    }

    /// Execute `command` and everything below it.
    #[async_recursion]
    pub async fn execute(
        &self,
        command: &Command,
        driver: &dyn AutomationDriver,
        ctx: &mut ExecutionContext,
    ) -> Result<Flow, FlowError> {
        debug!(kind = command.kind(), "executing node");
        match command {
            Command::Sequence { children } => {
                for (index, child) in children.iter().enumerate() {
                    let flow = self.execute(child, driver, ctx).await?;
                    if flow.is_terminated() {
                        debug!(
                            step = index + 1,
                            skipped = children.len() - index - 1,
                            "sequence stopped by exit"
                        );
                        return Ok(flow);
                    }
                }
                Ok(Flow::Continue)
            }

            Command::IfElse {
                condition,
                then,
                otherwise,
            } => {
                ctx.remove(CONDITION_RESULT);
                let flow = self.execute(condition, driver, ctx).await?;
                if flow.is_terminated() {
                    return Ok(flow);
                }
                let holds = ctx
                    .get_bool(CONDITION_RESULT)
                    .ok_or(FlowError::ConditionNotSet)?;
                debug!(holds, "condition evaluated");
                if holds {
                    self.execute(then, driver, ctx).await
                } else if let Some(otherwise) = otherwise {
                    self.execute(otherwise, driver, ctx).await
                } else {
                    Ok(Flow::Continue)
                }
            }

            Command::Navigate { url, wait_until } => {
                let url = interpolate(url, ctx);
                info!(url = %url, wait_until = %wait_until, "navigating");
                driver.navigate(&url, *wait_until).await?;
                Ok(Flow::Continue)
            }

            Command::Click {
                selector,
                timeout,
                post_click,
            } => {
                let selector = interpolate(selector, ctx).into_owned();
                self.click(&selector, *timeout, post_click, driver, ctx)
                    .await?;
                Ok(Flow::Continue)
            }

            Command::ElementExists { selector, timeout } => {
                let selector = interpolate(selector, ctx);
                if let Some(delay) = timeout {
                    tokio::time::sleep(*delay).await;
                }
                let count = match driver.locator_count(&selector).await {
                    Ok(count) => count,
                    Err(err) if err.is_not_found() => {
                        debug!(selector = %selector, error = %err, "element not found");
                        0
                    }
                    Err(err) => {
                        warn!(selector = %selector, error = %err, "element count failed; treating as absent");
                        0
                    }
                };
                debug!(selector = %selector, count, "element existence checked");
                ctx.set(CONDITION_RESULT, count > 0);
                Ok(Flow::Continue)
            }

            Command::FillForm { form_id } => {
                let form_id = interpolate(form_id, ctx).into_owned();
                self.fill_form(&form_id, driver, ctx).await?;
                Ok(Flow::Continue)
            }

            Command::Exit { success, message } => {
                ctx.set(WORKFLOW_FINISHED_SUCCESSFULLY, *success);
                let message = message.clone().filter(|m| !m.is_empty());
                if let Some(message) = &message {
                    ctx.set(WORKFLOW_FINISHED_MESSAGE, message.as_str());
                }
                info!(success, message = message.as_deref().unwrap_or(""), "workflow exit");
                Ok(Flow::Terminated {
                    success: *success,
                    message,
                })
            }

            Command::Screenshot { path_template } => {
                let dir = PathBuf::from(interpolate(path_template, ctx).as_ref());
                let file = dir.join(format!("{}.png", Uuid::new_v4()));
                if !dir.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(&dir).await?;
                }
                driver.screenshot(&file, true).await?;
                info!(path = %file.display(), "screenshot saved");
                Ok(Flow::Continue)
            }
        }
    }

    async fn click(
        &self,
        selector: &str,
        timeout: Option<Duration>,
        post_click: &PostClickWait,
        driver: &dyn AutomationDriver,
        ctx: &ExecutionContext,
    ) -> Result<(), FlowError> {
        info!(selector = %selector, "clicking");
        match post_click {
            PostClickWait::Delay { duration } => {
                driver.click(selector, timeout).await?;
                debug!(secs = duration.as_secs(), "sleeping after click");
                tokio::time::sleep(*duration).await;
            }
            PostClickWait::Selector { selector: next } => {
                let next = interpolate(next, ctx);
                if next.trim().is_empty() {
                    driver.click(selector, timeout).await?;
                    return Ok(());
                }
                debug!(wait_for = %next, "awaiting selector after click");
                let (_, found) = tokio::try_join!(
                    driver.click(selector, timeout),
                    driver.wait_for_selector(&next, None)
                )?;
                if !found {
                    return Err(DriverError::Timeout(format!(
                        "'{next}' did not appear after clicking '{selector}'"
                    ))
                    .into());
                }
            }
            PostClickWait::NetworkIdle => {
                debug!("awaiting network idle after click");
                tokio::try_join!(
                    driver.click(selector, timeout),
                    driver.wait_for_load_idle()
                )?;
            }
            PostClickWait::None => driver.click(selector, timeout).await?,
        }
        Ok(())
    }

    async fn fill_form(
        &self,
        form_id: &str,
        driver: &dyn AutomationDriver,
        ctx: &ExecutionContext,
    ) -> Result<(), FlowError> {
        let form = self.forms.get_form(form_id).await?;
        if form.fields.is_empty() {
            warn!(form = %form_id, "form has no fields to fill");
            return Ok(());
        }
        let kinds = form
            .fields
            .iter()
            .map(FieldConfig::kind)
            .collect::<Result<Vec<_>, _>>()?;

        info!(form = %form_id, name = %form.form_name, fields = form.fields.len(), "filling form");
        let mut filled = 0usize;
        for (field, kind) in form.fields.iter().zip(kinds) {
            match fill_field(field, kind, driver, ctx).await {
                Ok(true) => {
                    filled += 1;
                    debug!(field = %field.field_name, "field filled");
                }
                Ok(false) => {}
                Err(err) => {
                    warn!(field = %field.field_name, error = %err, "field skipped after driver error")
                }
            }
        }
        info!(form = %form_id, filled, total = form.fields.len(), "form filled");
        Ok(())
    }
}

/// Fill one field; `Ok(false)` when the field was skipped.
async fn fill_field(
    field: &FieldConfig,
    kind: FieldType,
    driver: &dyn AutomationDriver,
    ctx: &ExecutionContext,
) -> Result<bool, DriverError> {
    let selector = interpolate(&field.selector, ctx).into_owned();

    if driver.locator_count(&selector).await? == 0 {
        warn!(field = %field.field_name, selector = %selector, "field not found on page");
        return Ok(false);
    }
    let visible = driver.is_visible(&selector).await?;
    let enabled = driver.is_enabled(&selector).await?;
    if !visible || !enabled {
        warn!(
            field = %field.field_name,
            selector = %selector,
            visible,
            enabled,
            "field not interactable"
        );
        return Ok(false);
    }

    let value = interpolate(&field.data_value, ctx).into_owned();
    debug!(field = %field.field_name, kind = %kind, selector = %selector, "filling field");
    match kind {
        FieldType::Text | FieldType::Email | FieldType::Password | FieldType::Textarea => {
            driver.fill(&selector, "").await?;
            driver.fill(&selector, &value).await?;
        }
        FieldType::Select => driver.select_option(&selector, &value).await?,
        FieldType::Radio => {
            driver
                .check(&format!("{selector}[value='{value}']"))
                .await?
        }
        FieldType::Checkbox => match parse_checkbox(&value) {
            Some(true) => driver.check(&selector).await?,
            Some(false) => driver.uncheck(&selector).await?,
            None => {
                warn!(field = %field.field_name, value = %value, "checkbox value is not a boolean");
                return Ok(false);
            }
        },
        FieldType::File => {
            if let Err(err) = driver.set_input_files(&selector, Path::new(&value)).await {
                warn!(field = %field.field_name, file = %value, error = %err, "file upload failed");
            }
        }
    }
    Ok(true)
}
