use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use super::dto::{business_from_row, business_insert_body, business_patch_body, ReservationRow};
use super::{decode_json, status_error, ApiErrorBody, RestBackend, NO_ROWS_CODE, SINGLE_OBJECT};
use crate::contract::model::{
    BusinessId, BusinessProfile, BusinessProfilePatch, BusinessVertical, NewBusinessProfile,
    Reservation, ReservationId, ReservationStatus, UserId,
};
use crate::domain::error::{DataError, NetworkError};
use crate::domain::ports::{BusinessesTable, ReservationsTable};

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

/// Map a non-success table response; 4xx bodies carry a PostgREST message.
async fn table_error(response: reqwest::Response) -> DataError {
    let status = response.status();
    if status.is_server_error() || status == reqwest::StatusCode::UNAUTHORIZED {
        return DataError::Network(status_error(response).await);
    }
    let text = response.text().await.unwrap_or_default();
    let body = ApiErrorBody::parse(&text);
    let message = body.message();
    DataError::remote(if message.is_empty() { format!("HTTP {status}") } else { message })
}

#[async_trait]
impl BusinessesTable for RestBackend {
    #[instrument(name = "partner_core.backend.businesses.find_for_user", skip(self), fields(user_id = %user_id, vertical = %vertical))]
    async fn find_for_user(
        &self,
        user_id: UserId,
        vertical: BusinessVertical,
    ) -> Result<Option<BusinessProfile>, DataError> {
        let url = self.endpoint(&["rest", "v1", "businesses"])?;
        let response = self
            .send(|c| {
                c.request(reqwest::Method::GET, url.as_str())
                    .query(&[
                        ("select", "*".to_string()),
                        ("user_id", eq(user_id)),
                        ("type", eq(vertical)),
                    ])
                    .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
            })
            .await?;

        if response.status().is_success() {
            let row: Value = decode_json(response).await?;
            return business_from_row(row).map(Some);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if ApiErrorBody::parse(&text).code().as_deref() == Some(NO_ROWS_CODE) {
            debug!("No business registered for this vertical");
            return Ok(None);
        }
        Err(DataError::Network(NetworkError::Status {
            status: status.as_u16(),
            body: text,
        }))
    }

    #[instrument(name = "partner_core.backend.businesses.insert", skip(self, profile), fields(user_id = %user_id))]
    async fn insert(
        &self,
        user_id: UserId,
        profile: &NewBusinessProfile,
    ) -> Result<BusinessProfile, DataError> {
        let url = self.endpoint(&["rest", "v1", "businesses"])?;
        let body = business_insert_body(user_id, profile)?;
        let response = self
            .send(|c| {
                c.request(reqwest::Method::POST, url.as_str())
                    .header("Prefer", "return=representation")
                    .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
                    .json(&body)
            })
            .await?;
        if !response.status().is_success() {
            return Err(table_error(response).await);
        }
        business_from_row(decode_json(response).await?)
    }

    #[instrument(name = "partner_core.backend.businesses.update", skip(self, patch), fields(business_id = %id))]
    async fn update(
        &self,
        id: BusinessId,
        patch: &BusinessProfilePatch,
    ) -> Result<BusinessProfile, DataError> {
        let url = self.endpoint(&["rest", "v1", "businesses"])?;
        let body = business_patch_body(patch);
        let response = self
            .send(|c| {
                c.request(reqwest::Method::PATCH, url.as_str())
                    .query(&[("id", eq(id))])
                    .header("Prefer", "return=representation")
                    .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
                    .json(&body)
            })
            .await?;

        if response.status().is_success() {
            return business_from_row(decode_json(response).await?);
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if ApiErrorBody::parse(&text).code().as_deref() == Some(NO_ROWS_CODE) {
            return Err(DataError::NotFound {
                entity: "business",
                id,
            });
        }
        Err(DataError::Network(NetworkError::Status {
            status: status.as_u16(),
            body: text,
        }))
    }
}

#[async_trait]
impl ReservationsTable for RestBackend {
    /// Rows that cannot be mapped are skipped with a warning; the rest of the
    /// list still loads.
    #[instrument(name = "partner_core.backend.reservations.list", skip(self), fields(business_id = %business_id, vertical = %vertical))]
    async fn list_for_business(
        &self,
        business_id: BusinessId,
        vertical: BusinessVertical,
    ) -> Result<Vec<Reservation>, DataError> {
        let url = self.endpoint(&["rest", "v1", "reservations"])?;
        let order = format!("{}.asc", vertical.date_column());
        let response = self
            .send(|c| {
                c.request(reqwest::Method::GET, url.as_str()).query(&[
                    ("select", "*".to_string()),
                    ("business_id", eq(business_id)),
                    ("order", order.clone()),
                ])
            })
            .await?;
        if !response.status().is_success() {
            return Err(table_error(response).await);
        }

        let rows: Vec<Value> = decode_json(response).await?;
        let total = rows.len();
        let reservations: Vec<Reservation> = rows
            .into_iter()
            .filter_map(|raw| {
                let mapped = serde_json::from_value::<ReservationRow>(raw)
                    .map_err(|e| DataError::malformed("reservation", e.to_string()))
                    .and_then(|row| row.into_domain(vertical));
                match mapped {
                    Ok(r) => Some(r),
                    Err(e) => {
                        warn!(error = %e, "Skipping reservation row");
                        None
                    }
                }
            })
            .collect();
        debug!(total, kept = reservations.len(), "Reservations fetched");
        Ok(reservations)
    }

    #[instrument(name = "partner_core.backend.reservations.update_status", skip(self), fields(reservation_id = %id, status = %status))]
    async fn update_status(
        &self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<(), DataError> {
        let url = self.endpoint(&["rest", "v1", "reservations"])?;
        let body = json!({ "status": status });
        let response = self
            .send(|c| {
                c.request(reqwest::Method::PATCH, url.as_str())
                    .query(&[("id", eq(id)), ("select", "id".to_string())])
                    .header("Prefer", "return=representation")
                    .json(&body)
            })
            .await?;
        if !response.status().is_success() {
            return Err(table_error(response).await);
        }
        // A filter that matches nothing still answers 200 with an empty array.
        let touched: Vec<Value> = decode_json(response).await?;
        if touched.is_empty() {
            return Err(DataError::NotFound {
                entity: "reservation",
                id,
            });
        }
        Ok(())
    }
}
