//! Initial context for one job run

use action_flow::context::{
    COMPANY_NAME, COVER_LETTER_PATH, JOB_ID, JOB_TITLE, JOB_URL, RESUME_PATH, USER_EMAIL,
    USER_FIRST_NAME, USER_PHONE, USER_SECOND_NAME,
};
use action_flow::ExecutionContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::Job;

/// Applicant data copied into every job context.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicantProfile {
    pub resume_path: String,
    pub cover_letter_path: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    /// Free-form variables, bound verbatim before the well-known ones.
    pub extra: BTreeMap<String, String>,
}

pub fn initial_context(job: &Job, applicant: &ApplicantProfile) -> ExecutionContext {
    let mut ctx = ExecutionContext::new();
    for (name, value) in &applicant.extra {
        ctx.set(name.as_str(), value.as_str());
    }
    ctx.set(JOB_URL, job.url.as_str());
    ctx.set(JOB_TITLE, job.title.as_str());
    ctx.set(JOB_ID, job.id.to_string());
    ctx.set(COMPANY_NAME, job.employer.clone().unwrap_or_default());
    ctx.set(RESUME_PATH, applicant.resume_path.as_str());
    ctx.set(COVER_LETTER_PATH, applicant.cover_letter_path.as_str());
    ctx.set(USER_FIRST_NAME, applicant.first_name.as_str());
    ctx.set(USER_SECOND_NAME, applicant.last_name.as_str());
    ctx.set(USER_PHONE, applicant.phone.as_str());
    ctx.set(USER_EMAIL, applicant.email.as_str());
    ctx
}
