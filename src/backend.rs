// src/backend.rs

//! The REST backend the agenda reads from and writes to.
//!
//! Responses are returned as raw JSON; decoding them is the normalizer's job
//! because the backend's envelopes and field names drift.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use crate::config::Config;
use crate::error::TransportError;
use crate::middleware::auth_context::AuthContext;
use crate::models::AppointmentPayload;

#[async_trait]
pub trait AgendaBackend: Send + Sync {
    async fn list_appointments(&self, limit: u32, offset: u32) -> Result<Value, TransportError>;

    async fn list_patients(&self, limit: u32, offset: u32) -> Result<Value, TransportError>;

    /// Returns the raw creation response; it should carry the new id.
    async fn create_appointment(&self, payload: &AppointmentPayload) -> Result<Value, TransportError>;

    async fn update_appointment(&self, id: &str, payload: &AppointmentPayload) -> Result<(), TransportError>;

    async fn delete_appointment(&self, id: &str) -> Result<(), TransportError>;
}

/// Binds a backend to one caller's credentials.
pub trait BackendConnector: Send + Sync {
    fn connect(&self, auth: &AuthContext) -> Arc<dyn AgendaBackend>;
}

/* ============================================================
   HTTP implementation
   ============================================================ */

#[derive(Clone)]
pub struct HttpConnector {
    client: Client,
    base_url: String,
    appointments_path: String,
    patients_path: String,
}

impl HttpConnector {
    pub fn new(cfg: &Config) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.backend_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.backend_url.trim_end_matches('/').to_string(),
            appointments_path: cfg.appointments_path.clone(),
            patients_path: cfg.patients_path.clone(),
        })
    }
}

impl BackendConnector for HttpConnector {
    fn connect(&self, auth: &AuthContext) -> Arc<dyn AgendaBackend> {
        Arc::new(HttpBackend {
            connector: self.clone(),
            access_token: auth.access_token.clone(),
        })
    }
}

pub struct HttpBackend {
    connector: HttpConnector,
    access_token: String,
}

impl HttpBackend {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.connector.base_url, path)
    }

    fn appointment_url(&self, id: &str) -> String {
        format!("{}/{}", self.url(&self.connector.appointments_path), id)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, TransportError> {
        let res = req.bearer_auth(&self.access_token).send().await?;
        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "backend request rejected");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AgendaBackend for HttpBackend {
    async fn list_appointments(&self, limit: u32, offset: u32) -> Result<Value, TransportError> {
        let url = self.url(&self.connector.appointments_path);
        let req = self
            .connector
            .client
            .get(url)
            .query(&[("limit", limit), ("offset", offset)]);
        self.send(req).await
    }

    async fn list_patients(&self, limit: u32, offset: u32) -> Result<Value, TransportError> {
        let url = self.url(&self.connector.patients_path);
        let req = self
            .connector
            .client
            .get(url)
            .query(&[("limit", limit), ("offset", offset)]);
        self.send(req).await
    }

    async fn create_appointment(&self, payload: &AppointmentPayload) -> Result<Value, TransportError> {
        let url = self.url(&self.connector.appointments_path);
        self.send(self.connector.client.post(url).json(payload)).await
    }

    async fn update_appointment(&self, id: &str, payload: &AppointmentPayload) -> Result<(), TransportError> {
        let url = self.appointment_url(id);
        self.send(self.connector.client.put(url).json(payload)).await?;
        Ok(())
    }

    async fn delete_appointment(&self, id: &str) -> Result<(), TransportError> {
        let url = self.appointment_url(id);
        self.send(self.connector.client.delete(url)).await?;
        Ok(())
    }
}

/* ============================================================
   In-memory backend for tests
   ============================================================ */

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    #[derive(Default)]
    struct Inner {
        records: Vec<Value>,
        patients: Vec<Value>,
        next_id: u64,
        calls: Vec<String>,
        fail_writes: bool,
        fail_reads: bool,
        ignore_offset: bool,
    }

    /// Stores raw records the way a REST backend would and wraps list
    /// responses in a `{"citas": [...]}` envelope.
    #[derive(Default)]
    pub struct MemoryBackend {
        inner: Mutex<Inner>,
    }

    impl MemoryBackend {
        pub fn with_records(records: Vec<Value>) -> Self {
            let backend = MemoryBackend::default();
            {
                let mut inner = backend.inner.lock().unwrap();
                inner.next_id = 1000;
                inner.records = records;
            }
            backend
        }

        pub fn set_patients(&self, patients: Vec<Value>) {
            self.inner.lock().unwrap().patients = patients;
        }

        pub fn fail_writes(&self, fail: bool) {
            self.inner.lock().unwrap().fail_writes = fail;
        }

        pub fn fail_reads(&self, fail: bool) {
            self.inner.lock().unwrap().fail_reads = fail;
        }

        /// Every list call answers with the first page.
        pub fn ignore_offset(&self, ignore: bool) {
            self.inner.lock().unwrap().ignore_offset = ignore;
        }

        pub fn calls(&self) -> Vec<String> {
            self.inner.lock().unwrap().calls.clone()
        }

        pub fn record_count(&self) -> usize {
            self.inner.lock().unwrap().records.len()
        }

        fn unavailable() -> TransportError {
            TransportError::Status {
                status: 503,
                body: "unavailable".into(),
            }
        }
    }

    fn page(list: &[Value], limit: u32, offset: u32) -> Vec<Value> {
        list.iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect()
    }

    fn same_id(record: &Value, id: &str) -> bool {
        match &record["id"] {
            Value::String(s) => s == id,
            Value::Number(n) => n.to_string() == id,
            _ => false,
        }
    }

    fn record_from(id: &str, payload: &AppointmentPayload) -> Value {
        let mut v = serde_json::to_value(payload).unwrap();
        v["id"] = json!(id);
        v
    }

    #[async_trait]
    impl AgendaBackend for MemoryBackend {
        async fn list_appointments(&self, limit: u32, offset: u32) -> Result<Value, TransportError> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(format!("list_appointments({limit},{offset})"));
            if inner.fail_reads {
                return Err(Self::unavailable());
            }
            let offset = if inner.ignore_offset { 0 } else { offset };
            Ok(json!({ "total": inner.records.len(), "citas": page(&inner.records, limit, offset) }))
        }

        async fn list_patients(&self, limit: u32, offset: u32) -> Result<Value, TransportError> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(format!("list_patients({limit},{offset})"));
            if inner.fail_reads {
                return Err(Self::unavailable());
            }
            Ok(json!({ "pacientes": page(&inner.patients, limit, offset) }))
        }

        async fn create_appointment(&self, payload: &AppointmentPayload) -> Result<Value, TransportError> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push("create_appointment".into());
            if inner.fail_writes {
                return Err(Self::unavailable());
            }
            inner.next_id += 1;
            let id = inner.next_id.to_string();
            inner.records.push(record_from(&id, payload));
            Ok(json!({ "data": { "id": id } }))
        }

        async fn update_appointment(&self, id: &str, payload: &AppointmentPayload) -> Result<(), TransportError> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(format!("update_appointment({id})"));
            if inner.fail_writes {
                return Err(Self::unavailable());
            }
            let replacement = record_from(id, payload);
            match inner.records.iter_mut().find(|r| same_id(r, id)) {
                Some(r) => *r = replacement,
                None => inner.records.push(replacement),
            }
            Ok(())
        }

        async fn delete_appointment(&self, id: &str) -> Result<(), TransportError> {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(format!("delete_appointment({id})"));
            if inner.fail_writes {
                return Err(Self::unavailable());
            }
            inner.records.retain(|r| !same_id(r, id));
            Ok(())
        }
    }
}
