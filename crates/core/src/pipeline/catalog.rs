//! Catalog maintenance: registering ETFs, replacing their constituent lists, and the
//! constituent overviews used by operators.

use crate::domain::etf::{Constituent, ConstituentListing, ConstituentSummary, Etf, NewEtf};
use crate::error::CoreError;
use crate::storage::{DeleteOutcome, EtfCatalog, EtfCatalogAdmin};
use std::sync::Arc;

pub struct CatalogManager {
    catalog: Arc<dyn EtfCatalog>,
    admin: Arc<dyn EtfCatalogAdmin>,
}

impl CatalogManager {
    pub fn new(catalog: Arc<dyn EtfCatalog>, admin: Arc<dyn EtfCatalogAdmin>) -> Self {
        Self { catalog, admin }
    }

    pub async fn create(&self, etf: NewEtf) -> Result<Etf, CoreError> {
        let etf = NewEtf {
            name: etf.name.trim().to_string(),
            ..etf
        };
        if etf.name.is_empty() {
            return Err(CoreError::Invalid("etf name must not be empty".to_string()));
        }
        if !(0..=9).contains(&etf.risk_level) {
            return Err(CoreError::Invalid(format!(
                "risk level must be within 0..=9, got {}",
                etf.risk_level
            )));
        }
        if self.catalog.find_etf_by_name(&etf.name).await?.is_some() {
            return Err(CoreError::Conflict(format!("etf {} already exists", etf.name)));
        }

        let created = self.admin.create_etf(&etf).await?;
        tracing::info!(etf_id = created.id, etf = %created.name, "etf created");
        Ok(created)
    }

    /// Replaces the stored constituent list wholesale.
    pub async fn replace_constituents(
        &self,
        etf_id: i64,
        constituents: Vec<Constituent>,
    ) -> Result<Etf, CoreError> {
        for c in &constituents {
            if c.code.trim().is_empty() {
                return Err(CoreError::Invalid("constituent code must not be empty".to_string()));
            }
            if !c.weight_percent.is_finite() || !(0.0..=100.0).contains(&c.weight_percent) {
                return Err(CoreError::Invalid(format!(
                    "constituent {} weight must be within 0..=100, got {}",
                    c.code, c.weight_percent
                )));
            }
        }

        let etf = self
            .admin
            .replace_constituents(etf_id, &constituents)
            .await?
            .ok_or_else(|| CoreError::not_found("etf", etf_id))?;
        tracing::info!(etf_id, constituents = etf.constituents.len(), "etf constituents replaced");
        Ok(etf)
    }

    pub async fn clear_constituents(&self, etf_id: i64) -> Result<Etf, CoreError> {
        self.replace_constituents(etf_id, Vec::new()).await
    }

    pub async fn delete(&self, etf_id: i64) -> Result<(), CoreError> {
        match self.admin.delete_etf(etf_id).await? {
            DeleteOutcome::Deleted => {
                tracing::info!(etf_id, "etf deleted");
                Ok(())
            }
            DeleteOutcome::NotFound => Err(CoreError::not_found("etf", etf_id)),
            DeleteOutcome::Referenced => Err(CoreError::Conflict(format!(
                "etf {etf_id} is still referenced by news or portfolios"
            ))),
        }
    }

    pub async fn summary(&self) -> Result<Vec<ConstituentSummary>, CoreError> {
        let etfs = self.catalog.list_etfs().await?;
        Ok(etfs
            .iter()
            .map(|etf| ConstituentSummary {
                etf_id: etf.id,
                etf_name: etf.name.clone(),
                category: etf.category_or_default().to_string(),
                constituent_count: etf.constituents.len(),
            })
            .collect())
    }

    pub async fn constituents(&self, etf_id: i64) -> Result<ConstituentListing, CoreError> {
        let etf = self
            .catalog
            .find_etf(etf_id)
            .await?
            .ok_or_else(|| CoreError::not_found("etf", etf_id))?;
        let constituents: Vec<Constituent> = etf
            .top_constituents(etf.constituents.len())
            .into_iter()
            .cloned()
            .collect();
        Ok(ConstituentListing {
            etf_id: etf.id,
            etf_name: etf.name,
            total_constituents: constituents.len(),
            constituents,
        })
    }
}
