/// Subscription handshake with the notification broker
///
/// SNS will not deliver notifications to an HTTP endpoint until the endpoint
/// confirms the subscription with the token from the confirmation request.
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::SubscriptionConfirmation;
use async_trait::async_trait;
use aws_sdk_sns::Client as SnsClient;
use tracing::{error, info};

#[async_trait]
pub trait NotificationBroker: Send + Sync {
    /// Confirm a pending subscription; unsubscribe will require authentication.
    async fn confirm_subscription(&self, token: &str, topic_arn: &str) -> Result<()>;
}

/// AWS SNS broker
#[derive(Clone)]
pub struct SnsBroker {
    client: SnsClient,
}

impl SnsBroker {
    pub fn new(client: SnsClient) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        let client = SnsClient::new(config);
        info!("AWS SNS client initialized for subscription confirmation");
        Self::new(client)
    }
}

#[async_trait]
impl NotificationBroker for SnsBroker {
    async fn confirm_subscription(&self, token: &str, topic_arn: &str) -> Result<()> {
        let output = self
            .client
            .confirm_subscription()
            .token(token)
            .topic_arn(topic_arn)
            .authenticate_on_unsubscribe("true")
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("SNS confirm subscription failed: {e}")))?;

        info!(
            topic_arn = %topic_arn,
            subscription_arn = ?output.subscription_arn(),
            "Subscription confirmed"
        );
        Ok(())
    }
}

/// Run the handshake for one confirmation request; failures are logged only.
pub async fn confirm(broker: &dyn NotificationBroker, confirmation: &SubscriptionConfirmation) {
    match broker
        .confirm_subscription(&confirmation.token, &confirmation.topic_arn)
        .await
    {
        Ok(()) => metrics::record_confirmation("confirmed"),
        Err(e) => {
            metrics::record_confirmation("failed");
            error!(
                topic_arn = %confirmation.topic_arn,
                error = %e,
                "Failed to confirm subscription"
            );
        }
    }
}
