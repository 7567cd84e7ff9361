// External dashboard API repository implementation
use crate::application::dashboard_repository::{DashboardRepository, NewWidget};
use crate::domain::dashboard::{Dashboard, SectionLayout, Widget};
use crate::domain::schema::ColumnInfo;
use crate::domain::widget::Filter;
use crate::infrastructure::config::ApiSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct ApiRepository {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Serialize)]
struct LayoutBody<'a> {
    sections: &'a [SectionLayout],
}

#[derive(Serialize)]
struct NativeFiltersBody<'a> {
    native_filters: &'a [Filter],
}

impl ApiRepository {
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        })
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", action))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} failed with status {}: {}", action, status, body);
        }
        Ok(response)
    }
}

#[async_trait]
impl DashboardRepository for ApiRepository {
    async fn get_dashboard(&self, dashboard_id: &str) -> Result<Option<Dashboard>> {
        let url = self.url(&["dashboards", dashboard_id]);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .context("Failed to send get dashboard request")?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Get dashboard failed with status {}: {}", status, body);
        }

        let dashboard = response
            .json::<Dashboard>()
            .await
            .context("Failed to parse dashboard response")?;
        tracing::debug!(
            "Fetched dashboard {} with {} sections",
            dashboard.id,
            dashboard.sections.len()
        );
        Ok(Some(dashboard))
    }

    async fn list_view_columns(&self, view_id: &str) -> Result<Vec<ColumnInfo>> {
        let url = self.url(&["views", view_id, "columns"]);
        self.send(self.client.get(&url), "List view columns")
            .await?
            .json::<Vec<ColumnInfo>>()
            .await
            .context("Failed to parse view columns response")
    }

    async fn create_widget(&self, dashboard_id: &str, widget: &NewWidget) -> Result<Widget> {
        let url = self.url(&["dashboards", dashboard_id, "widgets"]);
        self.send(self.client.post(&url).json(widget), "Create widget")
            .await?
            .json::<Widget>()
            .await
            .context("Failed to parse created widget")
    }

    async fn update_widget(&self, dashboard_id: &str, widget: &Widget) -> Result<Widget> {
        let url = self.url(&["dashboards", dashboard_id, "widgets", &widget.id]);
        self.send(self.client.put(&url).json(widget), "Update widget")
            .await?
            .json::<Widget>()
            .await
            .context("Failed to parse updated widget")
    }

    async fn delete_widget(&self, dashboard_id: &str, widget_id: &str) -> Result<()> {
        let url = self.url(&["dashboards", dashboard_id, "widgets", widget_id]);
        self.send(self.client.delete(&url), "Delete widget").await?;
        Ok(())
    }

    async fn save_layout(&self, dashboard_id: &str, layout: &[SectionLayout]) -> Result<()> {
        let url = self.url(&["dashboards", dashboard_id, "layout"]);
        let body = LayoutBody { sections: layout };
        self.send(self.client.put(&url).json(&body), "Save layout").await?;
        Ok(())
    }

    async fn save_native_filters(&self, dashboard_id: &str, filters: &[Filter]) -> Result<()> {
        let url = self.url(&["dashboards", dashboard_id, "native-filters"]);
        let body = NativeFiltersBody {
            native_filters: filters,
        };
        self.send(self.client.put(&url).json(&body), "Save native filters")
            .await?;
        Ok(())
    }
}
