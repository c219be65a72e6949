use crate::{
    domain::{GeoPoint, Item, Lane},
    engine::BoardEngine,
    error::{BoardError, Result},
    intake::{IntakeStep, OrderDraft, SessionStore},
    notify::{Origin, SessionId},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Resolves a street address to coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// `Ok(None)` when the address is unknown
    async fn locate(&self, city: &str, street: &str, house_number: &str) -> Result<Option<GeoPoint>>;
}

/// What the dialogue does after an answer
#[derive(Debug, Clone, PartialEq)]
pub enum IntakeReply {
    /// Ask for the next field
    Next(IntakeStep),
    /// The order was placed on the board; the session is closed
    Created(Item),
}

/// Drives order drafts per session and places finished orders on the board
pub struct IntakeFlow {
    engine: Arc<BoardEngine>,
    sessions: Arc<dyn SessionStore>,
    geocoder: Option<Arc<dyn Geocoder>>,
}

impl IntakeFlow {
    pub fn new(engine: Arc<BoardEngine>, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            engine,
            sessions,
            geocoder: None,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Opens (or restarts) a session, optionally with the employee known
    pub async fn start(&self, session: &SessionId, employee_id: Option<&str>) -> Result<IntakeStep> {
        let draft = match employee_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => OrderDraft::for_employee(id),
            None => OrderDraft::new(),
        };
        self.sessions.save(session, &draft).await?;
        tracing::debug!(session = %session, step = ?draft.step(), "intake started");
        Ok(draft.step())
    }

    /// Feeds one answer into the session's draft
    pub async fn answer(&self, session: &SessionId, input: &str) -> Result<IntakeReply> {
        let mut draft = self
            .sessions
            .load(session)
            .await?
            .ok_or_else(|| BoardError::NotFound(format!("intake session {}", session)))?;

        let answered = draft.step();
        let next = draft.advance(input)?;

        if answered == IntakeStep::HouseNumber {
            self.locate(&mut draft).await?;
        }

        if next != IntakeStep::Complete {
            self.sessions.save(session, &draft).await?;
            return Ok(IntakeReply::Next(next));
        }

        let details = draft.into_details()?;
        let item = self
            .engine
            .append(Origin::Session(session.clone()), Lane::New, details)
            .await?;
        self.sessions.remove(session).await?;
        tracing::info!(session = %session, item_id = %item.id, "intake completed");

        Ok(IntakeReply::Created(item))
    }

    /// Abandons the session's draft
    pub async fn cancel(&self, session: &SessionId) -> Result<()> {
        self.sessions.remove(session).await
    }

    /// Current step of a live session
    pub async fn step(&self, session: &SessionId) -> Result<Option<IntakeStep>> {
        Ok(self.sessions.load(session).await?.map(|draft| draft.step()))
    }

    async fn locate(&self, draft: &mut OrderDraft) -> Result<()> {
        let Some(geocoder) = &self.geocoder else {
            return Ok(());
        };
        let (Some(city), Some(street), Some(house)) = (
            draft.city().map(str::to_string),
            draft.street().map(str::to_string),
            draft.house_number().map(str::to_string),
        ) else {
            return Ok(());
        };

        match geocoder.locate(&city, &street, &house).await? {
            Some(point) => {
                draft.set_location(point);
                Ok(())
            }
            None => Err(BoardError::InvalidInput(format!(
                "could not locate address {}, {} {}",
                city, street, house
            ))),
        }
    }
}
