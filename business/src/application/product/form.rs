use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use crate::domain::logger::Logger;
use crate::domain::product::errors::ProductError;
use crate::domain::product::model::Product;
use crate::domain::product::use_cases::create::{CreateProductParams, CreateProductUseCase};
use crate::domain::product::use_cases::progress::WriteProgress;
use crate::domain::product::use_cases::update::{UpdateProductParams, UpdateProductUseCase};
use crate::domain::product::value_objects::ProductId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    Idle,
    Uploading,
    Submitting,
    Succeeded(String),
    Failed(String),
}

impl FormStatus {
    pub fn code(&self) -> &'static str {
        match self {
            FormStatus::Idle => "idle",
            FormStatus::Uploading => "uploading",
            FormStatus::Submitting => "submitting",
            FormStatus::Succeeded(_) => "succeeded",
            FormStatus::Failed(_) => "failed",
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            FormStatus::Succeeded(message) | FormStatus::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("form.busy")]
    Busy,
    #[error(transparent)]
    Product(#[from] ProductError),
}

struct FormSession {
    status: Arc<watch::Sender<FormStatus>>,
    in_flight: bool,
}

impl FormSession {
    fn new() -> Self {
        let (status, _) = watch::channel(FormStatus::Idle);
        Self {
            status: Arc::new(status),
            in_flight: false,
        }
    }
}

type Sessions = Mutex<HashMap<String, FormSession>>;

fn lock(sessions: &Sessions) -> MutexGuard<'_, HashMap<String, FormSession>> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs add/edit form submissions and publishes their progress.
///
/// Each owner (the signed-in user) has its own form session: one submission
/// in flight at a time per owner, and its own status feed.
pub struct ProductFormController {
    create: Arc<dyn CreateProductUseCase>,
    update: Arc<dyn UpdateProductUseCase>,
    sessions: Sessions,
    logger: Arc<dyn Logger>,
}

struct InFlight<'a> {
    sessions: &'a Sessions,
    owner: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(session) = lock(self.sessions).get_mut(&self.owner) {
            session.in_flight = false;
        }
    }
}

struct StatusProgress(Arc<watch::Sender<FormStatus>>);

impl WriteProgress for StatusProgress {
    fn uploading(&self) {
        self.0.send_replace(FormStatus::Uploading);
    }

    fn writing(&self) {
        self.0.send_replace(FormStatus::Submitting);
    }
}

impl ProductFormController {
    pub fn new(
        create: Arc<dyn CreateProductUseCase>,
        update: Arc<dyn UpdateProductUseCase>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            create,
            update,
            sessions: Mutex::new(HashMap::new()),
            logger,
        }
    }

    pub fn status(&self, owner: &str) -> FormStatus {
        lock(&self.sessions)
            .get(owner)
            .map(|session| session.status.borrow().clone())
            .unwrap_or(FormStatus::Idle)
    }

    pub fn watch_status(&self, owner: &str) -> watch::Receiver<FormStatus> {
        lock(&self.sessions)
            .entry(owner.to_string())
            .or_insert_with(FormSession::new)
            .status
            .subscribe()
    }

    pub async fn submit_create(
        &self,
        owner: &str,
        params: CreateProductParams,
    ) -> Result<ProductId, FormError> {
        let (_guard, progress) = self.begin(owner, params.image.is_some())?;
        let result = self.create.execute_with_progress(params, &progress).await;
        self.finish(&progress, &result, "product.created");
        Ok(result?)
    }

    pub async fn submit_update(
        &self,
        owner: &str,
        params: UpdateProductParams,
    ) -> Result<Product, FormError> {
        let (_guard, progress) = self.begin(owner, params.image.is_some())?;
        let result = self.update.execute_with_progress(params, &progress).await;
        self.finish(&progress, &result, "product.updated");
        Ok(result?)
    }

    fn begin(
        &self,
        owner: &str,
        with_image: bool,
    ) -> Result<(InFlight<'_>, StatusProgress), FormError> {
        let mut sessions = lock(&self.sessions);
        let session = sessions
            .entry(owner.to_string())
            .or_insert_with(FormSession::new);
        if session.in_flight {
            self.logger.warn(&format!(
                "Form submission rejected for {owner}: another one is in flight"
            ));
            return Err(FormError::Busy);
        }
        session.in_flight = true;
        session.status.send_replace(if with_image {
            FormStatus::Uploading
        } else {
            FormStatus::Submitting
        });
        let progress = StatusProgress(session.status.clone());
        Ok((
            InFlight {
                sessions: &self.sessions,
                owner: owner.to_string(),
            },
            progress,
        ))
    }

    fn finish<T>(&self, progress: &StatusProgress, result: &Result<T, ProductError>, success: &str) {
        let status = match result {
            Ok(_) => FormStatus::Succeeded(success.to_string()),
            Err(err) => {
                self.logger.warn(&format!("Form submission failed: {}", err));
                FormStatus::Failed(err.to_string())
            }
        };
        progress.0.send_replace(status);
    }
}
