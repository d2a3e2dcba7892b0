//! Upstream ports - the gateway/REST collaborator as seen by the cache

mod upstream;

pub use upstream::{
    ChannelDirectory, HistoryAnchor, HistoryClient, HistoryQuery, MemberClient, UpstreamResult,
};
