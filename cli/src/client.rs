use std::cell::OnceCell;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use grocer_core::catalog::{CatalogService, RemoteBundle};
use grocer_core::error::{Endpoint, GroceryError};
use grocer_core::models::{
    BudgetAlternative, ConfirmResponse, CostEstimate, GroceryCatalog, GrocerySummary,
    MissingItem, PurchaseUpdate, StoreSuggestion, null_as_default,
};
use grocer_core::mutator::PurchaseConfirmer;

use crate::config::ApiSettings;

/// `{ success, data, error }` wrapper around every catalog service response.
#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<ErrorBody>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl<T> Envelope<T> {
    fn reason(&self) -> String {
        self.error
            .as_ref()
            .and_then(|e| e.message.clone())
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "request was not successful".to_string())
    }

    fn into_data(self) -> Result<T> {
        if !self.success {
            bail!("{}", self.reason());
        }
        self.data.context("response carried no data")
    }
}

#[derive(Deserialize)]
struct ListData {
    list: GroceryCatalog,
}

#[derive(Deserialize)]
struct MissingData {
    #[serde(default, deserialize_with = "null_as_default")]
    missing: Vec<MissingItem>,
}

#[derive(Deserialize)]
struct StoresData {
    #[serde(default, deserialize_with = "null_as_default")]
    stores: Vec<StoreSuggestion>,
}

#[derive(Deserialize)]
struct AlternativesData {
    #[serde(default, deserialize_with = "null_as_default")]
    alternatives: Vec<BudgetAlternative>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MissingRequest<'a> {
    pantry_items: &'a [String],
}

#[derive(Serialize)]
struct MarkPurchasedRequest<'a> {
    items: &'a [PurchaseUpdate],
}

async fn tagged<T>(
    endpoint: Endpoint,
    meal_plan_id: &str,
    call: impl Future<Output = Result<T>>,
) -> Result<T, GroceryError> {
    call.await
        .map_err(|e| GroceryError::retrieval(endpoint, meal_plan_id, e))
}

/// HTTP client for the remote catalog service.
///
/// Owns a small runtime so the synchronous core traits can block on it; it
/// must not be used from inside another tokio runtime.
pub struct CatalogClient {
    client: reqwest::Client,
    rt: tokio::runtime::Runtime,
    base_url: Url,
    token: Option<String>,
}

impl CatalogClient {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url)
            .with_context(|| format!("Invalid API URL: '{}'", settings.base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("Invalid API URL: '{}'", settings.base_url);
        }

        let client = reqwest::Client::builder()
            .user_agent(format!("grocer-cli/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start HTTP runtime")?;

        Ok(Self {
            client,
            rt,
            base_url,
            token: settings.token.clone(),
        })
    }

    fn url(&self, meal_plan_id: &str, endpoint: Endpoint) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| anyhow!("API URL cannot carry a path"))?
            .pop_if_empty()
            .extend(["meal-plans", meal_plan_id, endpoint.path()]);
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, endpoint: Endpoint) -> Result<T> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let resp = request
            .send()
            .await
            .with_context(|| format!("Failed to reach catalog service ({endpoint})"))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("Failed to read {endpoint} response"))?;

        if !status.is_success() {
            let reason = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                .map(|envelope| envelope.reason())
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("error").to_string());
            bail!("{endpoint} returned {}: {reason}", status.as_u16());
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse {endpoint} response"))?;
        envelope
            .into_data()
            .with_context(|| format!("{endpoint} request failed"))
    }

    async fn get<T: DeserializeOwned>(&self, meal_plan_id: &str, endpoint: Endpoint) -> Result<T> {
        let url = self.url(meal_plan_id, endpoint)?;
        tracing::debug!(%url, "GET");
        self.send(self.client.get(url), endpoint).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        meal_plan_id: &str,
        endpoint: Endpoint,
        body: &B,
    ) -> Result<T> {
        let url = self.url(meal_plan_id, endpoint)?;
        tracing::debug!(%url, "POST");
        self.send(self.client.post(url).json(body), endpoint).await
    }

    async fn grocery_list_async(&self, meal_plan_id: &str) -> Result<GroceryCatalog> {
        let data: ListData = self.get(meal_plan_id, Endpoint::GroceryList).await?;
        Ok(data.list)
    }

    async fn store_suggestions_async(&self, meal_plan_id: &str) -> Result<Vec<StoreSuggestion>> {
        let data: StoresData = self.get(meal_plan_id, Endpoint::StoreSuggestions).await?;
        Ok(data.stores)
    }

    async fn budget_alternatives_async(&self, meal_plan_id: &str) -> Result<Vec<BudgetAlternative>> {
        let data: AlternativesData = self.get(meal_plan_id, Endpoint::BudgetAlternatives).await?;
        Ok(data.alternatives)
    }
}

impl CatalogService for CatalogClient {
    fn grocery_list(&self, meal_plan_id: &str) -> Result<GroceryCatalog> {
        self.rt.block_on(self.grocery_list_async(meal_plan_id))
    }

    fn grocery_summary(&self, meal_plan_id: &str) -> Result<GrocerySummary> {
        self.rt
            .block_on(self.get(meal_plan_id, Endpoint::GrocerySummary))
    }

    fn cost_estimate(&self, meal_plan_id: &str) -> Result<CostEstimate> {
        self.rt.block_on(self.get(meal_plan_id, Endpoint::CostEstimate))
    }

    fn store_suggestions(&self, meal_plan_id: &str) -> Result<Vec<StoreSuggestion>> {
        self.rt.block_on(self.store_suggestions_async(meal_plan_id))
    }

    fn budget_alternatives(&self, meal_plan_id: &str) -> Result<Vec<BudgetAlternative>> {
        self.rt.block_on(self.budget_alternatives_async(meal_plan_id))
    }

    fn missing_items(&self, meal_plan_id: &str, pantry_items: &[String]) -> Result<Vec<MissingItem>> {
        let body = MissingRequest { pantry_items };
        let data: MissingData = self
            .rt
            .block_on(self.post(meal_plan_id, Endpoint::MissingItems, &body))?;
        Ok(data.missing)
    }

    /// The five calls run concurrently; the first failure cancels the rest.
    fn fetch_all(&self, meal_plan_id: &str) -> Result<RemoteBundle, GroceryError> {
        let id = meal_plan_id;
        let (catalog, summary, cost_estimate, store_suggestions, budget_alternatives) =
            self.rt.block_on(async {
                tokio::try_join!(
                    tagged(Endpoint::GroceryList, id, self.grocery_list_async(id)),
                    tagged(
                        Endpoint::GrocerySummary,
                        id,
                        self.get::<GrocerySummary>(id, Endpoint::GrocerySummary)
                    ),
                    tagged(
                        Endpoint::CostEstimate,
                        id,
                        self.get::<CostEstimate>(id, Endpoint::CostEstimate)
                    ),
                    tagged(Endpoint::StoreSuggestions, id, self.store_suggestions_async(id)),
                    tagged(
                        Endpoint::BudgetAlternatives,
                        id,
                        self.budget_alternatives_async(id)
                    ),
                )
            })?;

        Ok(RemoteBundle {
            catalog,
            summary,
            cost_estimate,
            store_suggestions,
            budget_alternatives,
        })
    }
}

impl PurchaseConfirmer for CatalogClient {
    fn confirm(&self, meal_plan_id: &str, items: &[PurchaseUpdate]) -> Result<ConfirmResponse> {
        let body = MarkPurchasedRequest { items };
        self.rt
            .block_on(self.post(meal_plan_id, Endpoint::MarkPurchased, &body))
    }
}

/// Connection to the catalog service, opened on first use so commands that
/// only touch local state never parse the API settings.
pub struct Remote {
    settings: ApiSettings,
    client: OnceCell<Arc<CatalogClient>>,
}

impl Remote {
    #[must_use]
    pub fn new(settings: ApiSettings) -> Self {
        Self {
            settings,
            client: OnceCell::new(),
        }
    }

    pub fn client(&self) -> Result<Arc<CatalogClient>> {
        if let Some(client) = self.client.get() {
            return Ok(client.clone());
        }
        let client = Arc::new(CatalogClient::new(&self.settings)?);
        Ok(self.client.get_or_init(|| client).clone())
    }
}
