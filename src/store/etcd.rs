use std::collections::VecDeque;
use std::time::Duration;

use futures::stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::async_trait;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::transport::ClientTlsConfig;
use tonic::transport::Endpoint;
use tonic::Streaming;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::proto;
use super::proto::watch_request::RequestUnion;
use super::CoordinationStore;
use super::KeyValue;
use super::WatchEvent;
use super::WatchEventKind;
use super::WatchStream;
use crate::Result;
use crate::StoreConfig;
use crate::StoreError;

const RANGE_PATH: &str = "/etcdserverpb.KV/Range";
const WATCH_PATH: &str = "/etcdserverpb.Watch/Watch";

/// etcd v3 client speaking the KV and Watch gRPC services
#[derive(Clone)]
pub struct EtcdStore {
    channel: Channel,
    request_timeout: Duration,
    max_decoding_message_size: usize,
}

impl EtcdStore {
    /// Connects to the first endpoint that accepts a connection.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let mut last_error = String::from("no endpoint tried");

        for address in &config.endpoints {
            let endpoint = build_endpoint(address, config)?;
            debug!(%address, "Connecting to etcd");
            match endpoint.connect().await {
                Ok(channel) => {
                    info!(%address, "Connected to etcd server");
                    return Ok(Self {
                        channel,
                        request_timeout: config.request_timeout(),
                        max_decoding_message_size: config.max_decoding_message_size,
                    });
                }
                Err(e) => {
                    warn!(%address, "Failed to connect to etcd endpoint: {}", e);
                    last_error = e.to_string();
                }
            }
        }

        Err(StoreError::Connect {
            endpoints: config.endpoints.clone(),
            reason: last_error,
        }
        .into())
    }

    async fn grpc(&self) -> Result<Grpc<Channel>> {
        let mut grpc = Grpc::new(self.channel.clone())
            .max_decoding_message_size(self.max_decoding_message_size);
        grpc.ready()
            .await
            .map_err(|e| tonic::Status::unknown(format!("Service was not ready: {e}")))?;
        Ok(grpc)
    }

    async fn range(
        &self,
        request: proto::RangeRequest,
    ) -> Result<proto::RangeResponse> {
        let mut grpc = self.grpc().await?;
        let codec: ProstCodec<proto::RangeRequest, proto::RangeResponse> = ProstCodec::default();
        let response = grpc
            .unary(
                tonic::Request::new(request),
                PathAndQuery::from_static(RANGE_PATH),
                codec,
            )
            .await?;
        Ok(response.into_inner())
    }
}

#[async_trait]
impl CoordinationStore for EtcdStore {
    async fn snapshot(
        &self,
        prefix: &str,
    ) -> Result<Vec<KeyValue>> {
        let request = proto::RangeRequest {
            key: prefix.as_bytes().to_vec(),
            range_end: prefix_range_end(prefix.as_bytes()),
            ..Default::default()
        };

        let response = tokio::time::timeout(self.request_timeout, self.range(request))
            .await
            .map_err(|_| StoreError::Timeout(self.request_timeout))??;

        debug!(
            count = response.count,
            revision = response.header.as_ref().map(|h| h.revision),
            "Range completed"
        );

        Ok(response
            .kvs
            .into_iter()
            .map(|kv| KeyValue {
                key: kv.key,
                value: kv.value,
            })
            .collect())
    }

    async fn watch(
        &self,
        prefix: &str,
    ) -> Result<WatchStream> {
        let create = proto::WatchRequest {
            request_union: Some(RequestUnion::CreateRequest(proto::WatchCreateRequest {
                key: prefix.as_bytes().to_vec(),
                range_end: prefix_range_end(prefix.as_bytes()),
                ..Default::default()
            })),
        };

        // The request side must stay open for as long as the watch is wanted.
        let (requests, outbound) = mpsc::channel(1);
        requests
            .send(create)
            .await
            .map_err(|_| crate::Error::Fatal("watch request channel closed".into()))?;

        let mut grpc = self.grpc().await?;
        let codec: ProstCodec<proto::WatchRequest, proto::WatchResponse> = ProstCodec::default();
        let inbound = grpc
            .streaming(
                tonic::Request::new(ReceiverStream::new(outbound)),
                PathAndQuery::from_static(WATCH_PATH),
                codec,
            )
            .await?
            .into_inner();

        let state = WatchState {
            inbound,
            pending: VecDeque::new(),
            done: false,
            _requests: requests,
        };

        Ok(Box::pin(stream::unfold(state, next_event)))
    }
}

struct WatchState {
    inbound: Streaming<proto::WatchResponse>,
    pending: VecDeque<WatchEvent>,
    done: bool,
    _requests: mpsc::Sender<proto::WatchRequest>,
}

async fn next_event(mut state: WatchState) -> Option<(Result<WatchEvent>, WatchState)> {
    loop {
        if let Some(event) = state.pending.pop_front() {
            return Some((Ok(event), state));
        }
        if state.done {
            return None;
        }

        match state.inbound.message().await {
            Ok(Some(response)) => {
                if response.created {
                    debug!(watch_id = response.watch_id, "Watch created");
                }
                if response.canceled {
                    state.done = true;
                    let reason = if response.compact_revision > 0 {
                        format!("compacted at revision {}", response.compact_revision)
                    } else {
                        response.cancel_reason
                    };
                    return Some((Err(StoreError::WatchCanceled(reason).into()), state));
                }
                trace!(events = response.events.len(), "Received watch response");
                state
                    .pending
                    .extend(response.events.into_iter().filter_map(convert_event));
            }
            Ok(None) => return None,
            Err(status) => {
                state.done = true;
                return Some((Err(status.into()), state));
            }
        }
    }
}

pub(crate) fn convert_event(event: proto::Event) -> Option<WatchEvent> {
    let kind = match proto::EventType::try_from(event.r#type) {
        Ok(proto::EventType::Put) => WatchEventKind::Put,
        Ok(proto::EventType::Delete) => WatchEventKind::Delete,
        Err(_) => {
            warn!(event_type = event.r#type, "Skipping watch event of unknown type");
            return None;
        }
    };
    let kv = event.kv?;

    Some(WatchEvent {
        kind,
        key: kv.key,
        value: kv.value,
    })
}

/// Smallest key greater than every key starting with `prefix`.
///
/// Follows etcd's prefix convention: increment the last byte below 0xff and
/// drop everything after it; a prefix of only 0xff bytes (or empty) maps to
/// `[0]`, meaning "to the end of the keyspace".
pub fn prefix_range_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    vec![0]
}

fn build_endpoint(
    address: &str,
    config: &StoreConfig,
) -> Result<Endpoint> {
    let invalid = |reason: String| StoreError::InvalidEndpoint {
        endpoint: address.to_string(),
        reason,
    };

    let mut endpoint = Endpoint::from_shared(address.to_string())
        .map_err(|e| invalid(e.to_string()))?
        .connect_timeout(config.connect_timeout())
        .tcp_keepalive(Some(Duration::from_secs(config.tcp_keepalive_in_secs)));

    if address.starts_with("https://") {
        endpoint = endpoint
            .tls_config(ClientTlsConfig::new().with_native_roots())
            .map_err(|e| invalid(e.to_string()))?;
    }

    Ok(endpoint)
}
