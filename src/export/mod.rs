mod error;
pub mod feed;
pub mod messages;
mod store;

pub use error::Error;
pub use store::Store;

use crate::facebook::{Client, Settings};
use futures::{future::LocalBoxFuture, FutureExt};
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type Result<T> = std::result::Result<T, Error>;

/// The data collection an export run retrieves.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Target {
    /// Timeline posts
    Feed,
    /// Conversations and their messages
    Messages,
}

impl Target {
    pub fn name(&self) -> &'static str {
        match self {
            Target::Feed => "feed",
            Target::Messages => "messages",
        }
    }

    pub fn from_name(name: &str) -> Option<Target> {
        match name {
            "feed" => Some(Target::Feed),
            "messages" => Some(Target::Messages),
            _ => None,
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Counts for a finished export run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Summary {
    pub written: usize,
    pub skipped: usize,
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} written, {} unchanged", self.written, self.skipped)
    }
}

/// The two export routines, each taking a token and an output directory.
pub trait Exporter {
    fn export_feed<'a>(
        &'a self,
        token: &'a str,
        output_dir: &'a Path,
    ) -> LocalBoxFuture<'a, Result<Summary>>;

    fn export_messages<'a>(
        &'a self,
        token: &'a str,
        output_dir: &'a Path,
    ) -> LocalBoxFuture<'a, Result<Summary>>;
}

/// Run exactly one export routine and wait for it to finish.
///
/// Arguments are passed through untouched: validating them is the routine's job.
pub async fn dispatch<E: Exporter>(
    exporter: &E,
    target: Target,
    token: &str,
    output_dir: &Path,
) -> Result<Summary> {
    log::debug!("Dispatching {} export to {:?}", target, output_dir);

    match target {
        Target::Feed => exporter.export_feed(token, output_dir).await,
        Target::Messages => exporter.export_messages(token, output_dir).await,
    }
}

/// Exports from the Graph API into a [`Store`].
pub struct GraphExporter {
    settings: Settings,
    compress: bool,
}

impl GraphExporter {
    pub fn new(settings: Settings, compress: bool) -> GraphExporter {
        GraphExporter { settings, compress }
    }

    async fn prepare(
        &self,
        target: Target,
        token: &str,
        output_dir: &Path,
    ) -> Result<(Client, Store)> {
        if token.is_empty() {
            return Err(Error::MissingAccessToken);
        }

        if output_dir.as_os_str().is_empty() {
            return Err(Error::MissingOutputDirectory);
        }

        let client = Client::new(token, self.settings.clone())?;
        let me = client.me().await?;

        log::info!(
            "Exporting {} for {} ({})",
            target,
            me.name.as_deref().unwrap_or("unnamed account"),
            me.id
        );

        let store = Store::open(output_dir, self.compress)?;

        Ok((client, store))
    }
}

impl Exporter for GraphExporter {
    fn export_feed<'a>(
        &'a self,
        token: &'a str,
        output_dir: &'a Path,
    ) -> LocalBoxFuture<'a, Result<Summary>> {
        async move {
            let (client, mut store) = self.prepare(Target::Feed, token, output_dir).await?;

            feed::export(&client, &mut store).await
        }
        .boxed_local()
    }

    fn export_messages<'a>(
        &'a self,
        token: &'a str,
        output_dir: &'a Path,
    ) -> LocalBoxFuture<'a, Result<Summary>> {
        async move {
            let (client, mut store) = self.prepare(Target::Messages, token, output_dir).await?;

            messages::export(&client, &mut store).await
        }
        .boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_names_round_trip() {
        for target in &[Target::Feed, Target::Messages] {
            assert_eq!(Target::from_name(target.name()), Some(*target));
        }
        assert_eq!(Target::from_name("photos"), None);
    }

    #[tokio::test]
    async fn empty_token_is_rejected_before_any_request() {
        // Nothing listens here, so any request would fail with a client error.
        let settings = Settings {
            base_url: "http://127.0.0.1:9".to_string(),
            ..Settings::default()
        };
        let exporter = GraphExporter::new(settings, false);
        let dir = tempfile::tempdir().unwrap();

        let result = exporter.export_messages("", dir.path()).await;

        assert!(matches!(result, Err(Error::MissingAccessToken)));
    }

    #[tokio::test]
    async fn empty_output_dir_is_rejected() {
        let exporter = GraphExporter::new(Settings::default(), false);

        let result = exporter.export_feed("TOKEN123", Path::new("")).await;

        assert!(matches!(result, Err(Error::MissingOutputDirectory)));
    }
}
