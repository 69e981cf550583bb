use crate::{
    schema::{
        DateRange, Destination, Document, ExportAttributes, ExportRequest, ExportRequestData, ExportRequestFilters,
        ExportResults, ExportStatus, GroupFilters, OrgFilters, Resource, COLUMNS, DATASET, FORMAT_CSV, STATUS_ERROR,
        STATUS_FINISHED,
    },
    Error, ExportJob, ExportProvider, ExportScope, PollConfig, SnykConfig, SnykUrl,
};
use async_trait::async_trait;
use dashboard_model::filters::{self, ExportFilters};
use nis2dash_common::upstream::truncate_body;
use nis2dash_infrastructure::tracing::PropagateCurrentContext;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::instrument;
use url::Url;

const CONTENT_TYPE_JSON_API: &str = "application/vnd.api+json";

#[async_trait]
pub trait UpstreamResponse: Sized {
    /// Turn a non-success response into [`Error::Upstream`].
    async fn or_upstream_error(self) -> Result<Self, Error>;
}

#[async_trait]
impl UpstreamResponse for reqwest::Response {
    async fn or_upstream_error(self) -> Result<Self, Error> {
        let status = self.status();
        if status.is_success() {
            Ok(self)
        } else {
            match self.text().await {
                Ok(body) => Err(Error::Upstream {
                    status,
                    body: truncate_body(body),
                }),
                Err(e) => Err(Error::Request(e)),
            }
        }
    }
}

enum JobState {
    Pending(String),
    Finished(Vec<String>),
    Failed,
}

/// Export provider backed by the Snyk REST API.
pub struct SnykClient {
    client: reqwest::Client,
    url: SnykUrl,
    token: String,
    group_id: String,
    scope: ExportScope,
    poll: PollConfig,
}

impl SnykClient {
    pub fn new(client: reqwest::Client, config: SnykConfig, poll: PollConfig) -> Self {
        Self {
            client,
            url: SnykUrl::new(config.api_base_url),
            token: config.token,
            group_id: config.group_id,
            scope: config.export_scope,
            poll,
        }
    }

    fn authorization(&self) -> String {
        format!("token {}", self.token)
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        let body = self
            .client
            .get(url)
            .header(AUTHORIZATION, self.authorization())
            .propagate_current_context()
            .send()
            .await?
            .or_upstream_error()
            .await?
            .bytes()
            .await?;

        Ok(serde_json::from_slice(&body)?)
    }

    #[instrument(skip(self), fields(group_id = %self.group_id), err)]
    pub async fn list_organizations(&self) -> Result<Vec<String>, Error> {
        let mut orgs = Vec::new();
        let mut next = Some(self.url.group_orgs(&self.group_id)?);

        while let Some(url) = next.take() {
            let page: Document<Vec<Resource>> = self.get(url).await?;
            orgs.extend(page.data.into_iter().map(|org| org.id));
            next = page
                .links
                .next
                .filter(|next| !next.is_empty())
                .map(|next| self.url.next_page(&next))
                .transpose()?;
        }

        log::info!("Found {} organizations in group {}", orgs.len(), self.group_id);
        Ok(orgs)
    }

    #[instrument(skip(self, filters), err)]
    pub async fn initiate_export(&self, filters: &ExportFilters) -> Result<ExportJob, Error> {
        let org_id = filters
            .orgs
            .first()
            .ok_or_else(|| Error::Configuration("no organization to export from".into()))?;

        let url = match self.scope {
            ExportScope::Org => self.url.org_export(org_id)?,
            ExportScope::Group => self.url.group_export(&self.group_id)?,
        };
        let request = export_request(self.scope, filters);

        log::info!("Starting export for {} organization(s)", filters.orgs.len());

        let body = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.authorization())
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON_API)
            .propagate_current_context()
            .body(serde_json::to_vec(&request)?)
            .send()
            .await?
            .or_upstream_error()
            .await?
            .bytes()
            .await?;
        let document: Document<Resource> = serde_json::from_slice(&body)?;

        log::info!("Export initiated: {}", document.data.id);

        Ok(ExportJob {
            id: document.data.id,
            org_id: org_id.clone(),
        })
    }

    #[instrument(skip(self), fields(export_id = %job.id), err)]
    pub async fn poll_status(&self, job: &ExportJob) -> Result<Url, Error> {
        match tokio::time::timeout(self.poll.timeout, self.poll_until_done(job)).await {
            Ok(result) => result,
            Err(_) => Err(Error::PollTimeout {
                export_id: job.id.clone(),
                timeout: self.poll.timeout,
            }),
        }
    }

    async fn poll_until_done(&self, job: &ExportJob) -> Result<Url, Error> {
        // a zero period would make the ticker panic
        let period = self.poll.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match self.check_status(job).await {
                Ok(JobState::Pending(status)) => {
                    log::info!("Export {} status: {status}", job.id);
                }
                Ok(JobState::Finished(files)) => {
                    let file = files.into_iter().next().ok_or_else(|| Error::MissingResults {
                        export_id: job.id.clone(),
                    })?;
                    log::info!("Export {} finished: {file}", job.id);
                    return Ok(Url::parse(&file)?);
                }
                Ok(JobState::Failed) => {
                    return Err(Error::ExportFailed {
                        export_id: job.id.clone(),
                    });
                }
                Err(err) => {
                    log::warn!("Failed to check status of export {}, retrying: {err}", job.id);
                }
            }
        }
    }

    async fn check_status(&self, job: &ExportJob) -> Result<JobState, Error> {
        let url = match self.scope {
            ExportScope::Org => self.url.org_export_status(&job.org_id, &job.id)?,
            ExportScope::Group => self.url.group_export_status(&self.group_id, &job.id)?,
        };
        let status: Document<ExportStatus> = self.get(url).await?;
        let attributes = status.data.attributes;

        match attributes.status.as_str() {
            STATUS_FINISHED => {
                let results = match self.scope {
                    ExportScope::Org => {
                        let url = self.url.org_export_results(&job.org_id, &job.id)?;
                        let results: Document<ExportStatus> = self.get(url).await?;
                        results.data.attributes.results
                    }
                    ExportScope::Group => attributes.results,
                };
                let files = results
                    .map(ExportResults::into_files)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|file| file.url)
                    .collect();
                Ok(JobState::Finished(files))
            }
            STATUS_ERROR => Ok(JobState::Failed),
            _ => Ok(JobState::Pending(attributes.status)),
        }
    }
}

#[async_trait]
impl ExportProvider for SnykClient {
    async fn list_organizations(&self) -> Result<Vec<String>, Error> {
        SnykClient::list_organizations(self).await
    }

    async fn initiate_export(&self, filters: &ExportFilters) -> Result<ExportJob, Error> {
        SnykClient::initiate_export(self, filters).await
    }

    async fn poll_status(&self, job: &ExportJob) -> Result<Url, Error> {
        SnykClient::poll_status(self, job).await
    }
}

fn date_range(range: &filters::DateRange) -> DateRange {
    DateRange {
        from: range.from.clone(),
        to: range.to.clone(),
    }
}

/// Build the request body starting an export.
pub fn export_request(scope: ExportScope, filters: &ExportFilters) -> ExportRequest {
    let (r#type, destination, request_filters) = match scope {
        ExportScope::Org => (
            "resource",
            None,
            ExportRequestFilters::Org(OrgFilters {
                introduced: date_range(&filters.introduced),
                updated: date_range(&filters.updated),
                environment: filters.environments.clone(),
                lifecycle: filters.lifecycles.clone(),
                severities: filters.severities.clone(),
            }),
        ),
        ExportScope::Group => (
            "export",
            Some(Destination { r#type: "snyk".into() }),
            ExportRequestFilters::Group(GroupFilters {
                orgs: filters.orgs.clone(),
                introduced: date_range(&filters.introduced),
                updated: date_range(&filters.updated),
                project_environment: filters.environments.clone(),
                project_lifecycle: filters.lifecycles.clone(),
                severities: filters.severities.clone(),
            }),
        ),
    };

    ExportRequest {
        data: ExportRequestData {
            r#type: r#type.into(),
            attributes: ExportAttributes {
                formats: vec![FORMAT_CSV.into()],
                columns: COLUMNS.iter().map(|column| column.to_string()).collect(),
                dataset: DATASET.into(),
                destination,
                filters: request_filters,
            },
        },
    }
}
