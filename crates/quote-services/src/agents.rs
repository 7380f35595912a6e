//! Agent profile CRUD service.

use crate::{ServiceError, ServiceResult};
use quote_database::{now_unix, Agent, NewAgent};
use std::sync::Arc;
use storage_adapter::{DatabaseAdapter, SqlRow};

const AGENT_COLUMNS: &str =
    "id, first_name, last_name, email, phone, agency, created_at, updated_at";

/// CRUD over the `agents` table. Queue rows reference agents with
/// SET NULL on delete, so removing an agent never removes deliveries.
pub struct AgentService {
    adapter: Arc<dyn DatabaseAdapter>,
}

impl AgentService {
    pub fn new(adapter: Arc<dyn DatabaseAdapter>) -> Self {
        Self { adapter }
    }

    pub async fn create(&self, agent: &NewAgent) -> ServiceResult<Agent> {
        let now = now_unix();
        let result = self
            .adapter
            .execute(
                "INSERT INTO agents (first_name, last_name, email, phone, agency, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                vec![
                    agent.first_name.as_str().into(),
                    agent.last_name.as_str().into(),
                    agent.email.as_str().into(),
                    agent.phone.as_deref().into(),
                    agent.agency.as_deref().into(),
                    now.into(),
                ],
            )
            .await?;
        self.get(result.last_insert_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("agent not found after insert".to_string()))
    }

    pub async fn get(&self, id: i64) -> ServiceResult<Option<Agent>> {
        let rows = self
            .adapter
            .query(
                &format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS),
                vec![id.into()],
            )
            .await?;
        rows.first().map(map_agent).transpose()
    }

    pub async fn list(&self) -> ServiceResult<Vec<Agent>> {
        let rows = self
            .adapter
            .query(
                &format!("SELECT {} FROM agents ORDER BY last_name, first_name", AGENT_COLUMNS),
                vec![],
            )
            .await?;
        rows.iter().map(map_agent).collect()
    }

    pub async fn update(&self, agent: &Agent) -> ServiceResult<bool> {
        let result = self
            .adapter
            .execute(
                "UPDATE agents SET first_name = ?1, last_name = ?2, email = ?3, phone = ?4, \
                 agency = ?5, updated_at = ?6 WHERE id = ?7",
                vec![
                    agent.first_name.as_str().into(),
                    agent.last_name.as_str().into(),
                    agent.email.as_str().into(),
                    agent.phone.as_deref().into(),
                    agent.agency.as_deref().into(),
                    now_unix().into(),
                    agent.id.into(),
                ],
            )
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<bool> {
        let result = self
            .adapter
            .execute("DELETE FROM agents WHERE id = ?1", vec![id.into()])
            .await?;
        Ok(result.rows_affected > 0)
    }
}

fn map_agent(row: &SqlRow) -> ServiceResult<Agent> {
    Ok(Agent {
        id: row.get_i64("id")?,
        first_name: row.get_text("first_name")?,
        last_name: row.get_text("last_name")?,
        email: row.get_text("email")?,
        phone: row.get_opt_text("phone")?,
        agency: row.get_opt_text("agency")?,
        created_at: row.get_i64("created_at")?,
        updated_at: row.get_i64("updated_at")?,
    })
}
