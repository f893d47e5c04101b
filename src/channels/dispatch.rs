//! Pumps a channel's messages through the intake wizard.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tracing::{info, warn};

use crate::channels::{Channel, OutgoingResponse, StatusUpdate};
use crate::error::ChannelError;
use crate::intake::{IntakeWizard, WizardPhase};
use crate::render::PlanDocument;

/// Converse over `channel` until its input ends. Finished plans are written
/// into `output_dir`.
pub async fn run_channel(
    channel: &dyn Channel,
    wizard: &IntakeWizard,
    output_dir: &Path,
) -> Result<(), ChannelError> {
    for message in wizard.start().await {
        channel.respond(OutgoingResponse::text(message)).await?;
    }

    let mut stream = channel.start().await?;
    info!(channel = channel.name(), "Channel started");

    // A finished plan that could not be written yet.
    let mut unsaved: Option<PlanDocument> = None;

    while let Some(msg) = stream.next().await {
        if let Some(document) = unsaved.take() {
            unsaved = deliver_document(channel, output_dir, document).await?;
        }

        let status = wizard.status().await;
        if let WizardPhase::AwaitingAnswer(n) = status.phase {
            let notice = if n + 1 == crate::intake::QUESTION_COUNT {
                "Writing your plan, this can take a minute..."
            } else {
                "Thinking..."
            };
            channel
                .send_status(StatusUpdate::Thinking(notice.to_string()))
                .await?;
        }

        match wizard.handle_input(&msg.content).await {
            Ok(outcome) => {
                for message in outcome.messages {
                    channel.respond(OutgoingResponse::text(message)).await?;
                }
                if let Some(document) = outcome.document {
                    unsaved = deliver_document(channel, output_dir, document).await?;
                }
            }
            Err(e) => {
                warn!(channel = channel.name(), error = %e, "Message not processed");
                channel
                    .send_status(StatusUpdate::Error(format!(
                        "{e}. Nothing was recorded, please send that again."
                    )))
                    .await?;
            }
        }
    }

    info!(channel = channel.name(), "Channel input closed");
    channel.shutdown().await
}

/// Save the plan and tell the user where it went. Hands the document back if
/// the write failed so it can be retried.
async fn deliver_document(
    channel: &dyn Channel,
    output_dir: &Path,
    document: PlanDocument,
) -> Result<Option<PlanDocument>, ChannelError> {
    match save_document(output_dir, &document).await {
        Ok(path) => {
            channel
                .send_status(StatusUpdate::Status(format!(
                    "Plan saved to {}",
                    path.display()
                )))
                .await?;
            Ok(None)
        }
        Err(e) => {
            warn!(dir = %output_dir.display(), error = %e, "Could not write plan");
            channel
                .send_status(StatusUpdate::Error(format!(
                    "Could not save {} to {}: {e}. I'll try again after your next message.",
                    document.filename,
                    output_dir.display()
                )))
                .await?;
            Ok(Some(document))
        }
    }
}

/// Write a rendered plan into `dir`, creating it if needed.
pub async fn save_document(dir: &Path, document: &PlanDocument) -> Result<PathBuf, ChannelError> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&document.filename);
    tokio::fs::write(&path, &document.bytes).await?;
    info!(path = %path.display(), bytes = document.size(), "Plan written");
    Ok(path)
}
