use serde::Serialize;

use crate::model::connection::ConnectionInfo;
use crate::model::filter::Filters;

/// Body of a player update. Only the fields that are set are sent, the node
/// keeps the rest as they are.
#[derive(Serialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdatePlayer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<UpdateTrack>,
    /// Position in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<Filters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<ConnectionInfo>
}

/// Track to load into the player, `None` stops the current one.
#[derive(Serialize, Debug, Clone)]
pub(crate) struct UpdateTrack {
    pub encoded: Option<String>
}

impl UpdatePlayer {
    pub fn is_empty(&self) -> bool {
        self.track.is_none()
            && self.position.is_none()
            && self.paused.is_none()
            && self.volume.is_none()
            && self.filters.is_none()
            && self.voice.is_none()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn stop_sends_null_track() {
        let update = UpdatePlayer {
            track: Some(UpdateTrack { encoded: None }),
            ..Default::default()
        };

        assert_eq!(serde_json::to_value(&update).unwrap(), json!({ "track": { "encoded": null } }));
    }

    #[test]
    fn only_set_fields_are_sent() {
        let update = UpdatePlayer {
            position: Some(1500),
            paused: Some(false),
            filters: Some(Filters::default()),
            ..Default::default()
        };

        assert!(!update.is_empty());
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({ "position": 1500, "paused": false, "filters": {} })
        );
    }
}
