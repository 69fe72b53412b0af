use crate::data::definitions::{Definitions, StageDefinition};
use tracing::debug;
use volley::{RequestSpec, SessionContext};

const DEFAULT_USERNAME: &str = "admin";
const DEFAULT_PASSWORD: &str = "admin";
const PNG_MEDIA_TYPE: &str = "image/png";
const SVG_MEDIA_TYPE: &str = "image/svg+xml";

/// Builder used to build a StageLibraryChain instance
#[derive(Debug, Clone, Default)]
pub struct StageLibraryChainBuilder {
    username: Option<String>,
    password: Option<String>,
}

impl StageLibraryChainBuilder {
    /// Create a new StageLibraryChainBuilder instance.
    pub fn new() -> Self {
        Self {
            username: None,
            password: None,
        }
    }

    /// Log in with the given credentials.
    ///
    /// # Arguments
    /// `username` - the user to log in as.
    /// `password` - the user's password.
    ///
    /// # Returns
    /// This builder.
    pub fn with_credentials<T1: Into<String>, T2: Into<String>>(
        mut self,
        username: T1,
        password: T2,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Consume the builder and create a StageLibraryChain instance using all of the previously
    /// configured values or their defaults.
    pub fn build(mut self) -> StageLibraryChain {
        StageLibraryChain {
            username: self
                .username
                .take()
                .unwrap_or_else(|| String::from(DEFAULT_USERNAME)),
            password: self
                .password
                .take()
                .unwrap_or_else(|| String::from(DEFAULT_PASSWORD)),
        }
    }
}

/// Declares the stage library check: log in, read the pipeline and stage
/// definitions, then fetch the icon of the first stage.
#[derive(Debug, Clone)]
pub struct StageLibraryChain {
    username: String,
    password: String,
}

impl StageLibraryChain {
    /// The top-level request of the chain.
    ///
    /// # Arguments
    /// `session` - the run's root session, used to resolve URLs.
    pub fn login(&self, session: &SessionContext) -> RequestSpec {
        let url = session.url(format!(
            "login?j_username={}&j_password={}",
            urlencoding::encode(&self.username),
            urlencoding::encode(&self.password)
        ));

        RequestSpec::get(url)
            .named("Login to the data collector")
            .expect_status(200)
            .expect_header_contains("Content-Type", "text/html")
            .capture_session_header("set-cookie")
            .after(|_, session| Ok(vec![definitions(session)]))
    }
}

/// `GET rest/v1/definitions` carrying the login cookie.
pub fn definitions(session: &SessionContext) -> RequestSpec {
    RequestSpec::get(session.url("rest/v1/definitions"))
        .named("Should return pipeline & stage library definitions")
        .header("Content-Type", "application/json")
        .header("Accept", "application/json")
        .header("Cookie", session.cookie().unwrap_or_default())
        .expect_status(200)
        .expect_header_contains("content-type", "application/json")
        .expect_json("has exactly one pipeline definition", |body| {
            Ok(body.at("pipeline")?.len()? == 1)
        })
        .expect_json("has more than one stage definition", |body| {
            Ok(body.at("stages")?.len()? > 1)
        })
        .after_json(|body, session| {
            let definitions: Definitions = body.deserialize()?;
            debug!(
                pipelines = definitions.pipeline.len(),
                stages = definitions.stages.len(),
                "definitions received"
            );

            Ok(definitions
                .stages
                .first()
                .map(|stage| icon(session, stage))
                .into_iter()
                .collect())
        })
}

/// `GET rest/v1/definitions/stages/<library>/<stage>/icon`, expecting the
/// media type implied by the stage's icon file.
pub fn icon(session: &SessionContext, stage: &StageDefinition) -> RequestSpec {
    let url = session.url(format!(
        "rest/v1/definitions/stages/{}/{}/icon",
        urlencoding::encode(&stage.library),
        urlencoding::encode(&stage.name)
    ));

    RequestSpec::get(url)
        .named("Should return icon for stage library")
        .header("Cookie", session.cookie().unwrap_or_default())
        .expect_status(200)
        .expect_header_contains(
            "content-type",
            icon_content_type(stage.icon.as_deref().unwrap_or_default()),
        )
}

/// Media type served for an icon file, judged by its suffix. Stages without
/// an icon get the default SVG icon.
pub fn icon_content_type(icon: &str) -> &'static str {
    if icon.to_lowercase().ends_with(".png") {
        PNG_MEDIA_TYPE
    } else {
        SVG_MEDIA_TYPE
    }
}
