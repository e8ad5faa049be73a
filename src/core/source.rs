use crate::config::cli::LocalStorage;
use crate::domain::model::{BillingSnapshot, DataSource};
use crate::domain::ports::Storage;
use crate::utils::error::{BillingError, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;

pub const PLANS: &str = "plans";
pub const MEMBERS: &str = "members";
pub const MEMBERSHIPS: &str = "memberships";
pub const PAYMENTS: &str = "payments";

pub fn parse_csv<T: DeserializeOwned>(data: &[u8]) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }
    Ok(records)
}

pub async fn read_csv<S: Storage, T: DeserializeOwned>(storage: &S, file: &str) -> Result<Vec<T>> {
    let data = storage.read_file(file).await?;
    let records: Vec<T> = parse_csv(&data)?;
    tracing::debug!("Read {} records from {}", records.len(), file);
    Ok(records)
}

/// 匯出目錄：plans.csv, members.csv (可省略), memberships.csv, payments.csv
pub async fn load_local<S: Storage>(storage: &S) -> Result<BillingSnapshot> {
    let members_file = format!("{}.csv", MEMBERS);
    let members = if storage.exists(&members_file).await {
        read_csv(storage, &members_file).await?
    } else {
        tracing::debug!("{} not found, member names will be empty", members_file);
        Vec::new()
    };

    Ok(BillingSnapshot {
        plans: read_csv(storage, &format!("{}.csv", PLANS)).await?,
        members,
        memberships: read_csv(storage, &format!("{}.csv", MEMBERSHIPS)).await?,
        payments: read_csv(storage, &format!("{}.csv", PAYMENTS)).await?,
    })
}

/// REST access to the hosted backend's tables (PostgREST filter syntax).
pub struct ApiSource<'a> {
    client: &'a Client,
    endpoint: String,
    api_key: Option<String>,
}

impl<'a> ApiSource<'a> {
    pub fn new(client: &'a Client, endpoint: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub async fn fetch_table<T: DeserializeOwned>(&self, table: &str, gym_id: &str) -> Result<Vec<T>> {
        let url = format!("{}/{}", self.endpoint, table);
        tracing::debug!("Fetching {} for gym {}", url, gym_id);

        let mut request = self
            .client
            .get(&url)
            .query(&[("gym_id", format!("eq.{}", gym_id))])
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status for {}: {}", table, status);

        if !status.is_success() {
            return Err(BillingError::ApiStatusError {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.json().await?)
    }

    pub async fn load(&self, gym_id: &str) -> Result<BillingSnapshot> {
        let (plans, members, memberships, payments) = tokio::try_join!(
            self.fetch_table(PLANS, gym_id),
            self.fetch_table(MEMBERS, gym_id),
            self.fetch_table(MEMBERSHIPS, gym_id),
            self.fetch_table(PAYMENTS, gym_id),
        )?;

        Ok(BillingSnapshot {
            plans,
            members,
            memberships,
            payments,
        })
    }
}

pub async fn load_snapshot(
    source: &DataSource,
    gym_id: &str,
    client: &Client,
) -> Result<BillingSnapshot> {
    match source {
        DataSource::Local { dir } => {
            tracing::info!("📂 Loading billing data from {}", dir);
            load_local(&LocalStorage::new(dir.clone())).await
        }
        DataSource::Api { endpoint, api_key } => {
            tracing::info!("📡 Loading billing data from {}", endpoint);
            ApiSource::new(client, endpoint, api_key.clone())
                .load(gym_id)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Membership, Payment, PaymentMethod};
    use httpmock::prelude::*;

    #[test]
    fn test_parse_payments_csv() {
        let data = b"id,gym_id,membership_id,payment_month,amount_cents,paid_on,method,voided
pay-1, gym-a ,ms-1,2024-01,3000,2024-01-03,cash,false
pay-2,gym-a,ms-1,2024-02,3000,2024-02-02,card,true
";
        let payments: Vec<Payment> = parse_csv(data).unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].gym_id, "gym-a");
        assert_eq!(payments[0].method, PaymentMethod::Cash);
        assert!(payments[1].voided);
    }

    #[test]
    fn test_parse_memberships_with_open_end() {
        let data = b"id,gym_id,member_id,plan_id,start_date,end_date
ms-1,gym-a,mem-1,plan-1,2024-01-15,
ms-2,gym-a,mem-2,plan-1,2024-01-01,2024-06-30
";
        let memberships: Vec<Membership> = parse_csv(data).unwrap();
        assert_eq!(memberships[0].end_date, None);
        assert!(memberships[1].end_date.is_some());
    }

    #[test]
    fn test_bad_month_is_csv_error() {
        let data = b"id,gym_id,membership_id,payment_month,amount_cents,paid_on
pay-1,gym-a,ms-1,January,3000,2024-01-03
";
        let result: Result<Vec<Payment>> = parse_csv(data);
        assert!(matches!(result, Err(BillingError::CsvError(_))));
    }

    #[tokio::test]
    async fn test_fetch_table_sends_tenant_filter_and_key() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/rest/v1/plans")
                .query_param("gym_id", "eq.gym-a")
                .header("apikey", "secret");
            then.status(200).json_body(serde_json::json!([
                {"id": "plan-1", "gym_id": "gym-a", "name": "Monthly", "duration_months": 1, "price_cents": 3000}
            ]));
        });

        let client = Client::new();
        let source = ApiSource::new(&client, &server.url("/rest/v1/"), Some("secret".to_string()));
        let plans: Vec<crate::domain::model::Plan> =
            source.fetch_table(PLANS, "gym-a").await.unwrap();

        mock.assert();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].price.cents(), 3000);
    }

    #[tokio::test]
    async fn test_fetch_table_reports_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/plans");
            then.status(401);
        });

        let client = Client::new();
        let source = ApiSource::new(&client, &server.base_url(), None);
        let result: Result<Vec<crate::domain::model::Plan>> =
            source.fetch_table(PLANS, "gym-a").await;

        match result {
            Err(BillingError::ApiStatusError { status, .. }) => assert_eq!(status, 401),
            other => panic!("unexpected result: {:?}", other.map(|p| p.len())),
        }
    }
}
