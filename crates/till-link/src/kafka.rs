//! # Kafka Publisher
//!
//! Minimal acknowledged producer over the Kafka wire protocol.
//!
//! ## Publish Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Publish Lifecycle                               │
//! │                                                                         │
//! │  publish(event)                                                         │
//! │     │                                                                   │
//! │     ├─► layout cached? ──no──► Metadata v9 to a bootstrap server        │
//! │     │                           brokers + partition leaders             │
//! │     │                                                                   │
//! │     ├─► partition = murmur2(transactionId) % partitions                 │
//! │     │                                                                   │
//! │     ├─► Produce v7 (acks = -1, record batch v2) to the leader           │
//! │     │                                                                   │
//! │     └─► error? ── retryable ──► drop layout/connections, back off,      │
//! │                                  try again (bounded)                    │
//! │                                                                         │
//! │  One request in flight at a time: every publish awaits its ack.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No idempotence, no transactions, no batching across events.

use std::collections::HashMap;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use bytes::{Bytes, BytesMut};
use kafka_protocol::messages::metadata_request::MetadataRequestTopic;
use kafka_protocol::messages::produce_request::{PartitionProduceData, TopicProduceData};
use kafka_protocol::messages::{
    ApiKey, MetadataRequest, MetadataResponse, ProduceRequest, ProduceResponse, RequestHeader,
    ResponseHeader, TopicName,
};
use kafka_protocol::protocol::{Decodable, Encodable, HeaderVersion, StrBytes};
use kafka_protocol::records::{
    Compression, Record, RecordBatchEncoder, RecordEncodeOptions, TimestampType,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use till_core::TransactionEvent;

use crate::config::ProducerConfig;
use crate::error::{LinkError, LinkResult};
use crate::partitioner::partition_for_key;

const METADATA_VERSION: i16 = 9;
const PRODUCE_VERSION: i16 = 7;

/// All in-sync replicas must acknowledge.
pub const ACKS_ALL: i16 = -1;

/// Refuse frames larger than this.
const MAX_FRAME_BYTES: usize = 64 * 1024 * 1024;

type CompressFn = fn(&mut BytesMut, &mut BytesMut, Compression) -> anyhow::Result<()>;

// =============================================================================
// Acknowledgement
// =============================================================================

/// Where the broker stored a published event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishAck {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

// =============================================================================
// Broker Connection
// =============================================================================

/// One TCP connection speaking length-prefixed Kafka frames.
struct BrokerConnection {
    addr: String,
    stream: TcpStream,
    correlation_id: i32,
    client_id: String,
}

impl BrokerConnection {
    async fn connect(addr: &str, client_id: &str, connect_timeout: Duration) -> LinkResult<Self> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| LinkError::Timeout(connect_timeout.as_millis() as u64))?
            .map_err(|e| LinkError::ConnectionFailed(format!("{addr}: {e}")))?;
        stream.set_nodelay(true)?;

        debug!(addr, "Broker connection established");

        Ok(BrokerConnection {
            addr: addr.to_string(),
            stream,
            correlation_id: 0,
            client_id: client_id.to_string(),
        })
    }

    /// Sends one request and waits for its response.
    async fn send<Req, Resp>(
        &mut self,
        api_key: ApiKey,
        api_version: i16,
        request: &Req,
        request_timeout: Duration,
    ) -> LinkResult<Resp>
    where
        Req: Encodable + HeaderVersion,
        Resp: Decodable + HeaderVersion,
    {
        timeout(request_timeout, self.round_trip(api_key, api_version, request))
            .await
            .map_err(|_| LinkError::Timeout(request_timeout.as_millis() as u64))?
    }

    async fn round_trip<Req, Resp>(
        &mut self,
        api_key: ApiKey,
        api_version: i16,
        request: &Req,
    ) -> LinkResult<Resp>
    where
        Req: Encodable + HeaderVersion,
        Resp: Decodable + HeaderVersion,
    {
        self.correlation_id = self.correlation_id.wrapping_add(1);
        let correlation_id = self.correlation_id;

        let header = RequestHeader::default()
            .with_request_api_key(api_key as i16)
            .with_request_api_version(api_version)
            .with_correlation_id(correlation_id)
            .with_client_id(Some(StrBytes::from_string(self.client_id.clone())));

        let mut buf = BytesMut::new();
        header
            .encode(&mut buf, Req::header_version(api_version))
            .map_err(|e| LinkError::Codec(format!("encode header: {e}")))?;
        request
            .encode(&mut buf, api_version)
            .map_err(|e| LinkError::Codec(format!("encode request: {e}")))?;

        self.stream.write_i32(buf.len() as i32).await?;
        self.stream.write_all(&buf).await?;
        self.stream.flush().await?;

        let len = self.stream.read_i32().await?;
        if len < 0 || len as usize > MAX_FRAME_BYTES {
            return Err(LinkError::Codec(format!("invalid frame length {len}")));
        }
        let mut frame = vec![0u8; len as usize];
        self.stream.read_exact(&mut frame).await?;

        let mut cursor = &frame[..];
        let response_header = ResponseHeader::decode(&mut cursor, Resp::header_version(api_version))
            .map_err(|e| LinkError::Codec(format!("decode header: {e}")))?;
        if response_header.correlation_id != correlation_id {
            return Err(LinkError::Codec(format!(
                "correlation id mismatch: sent {}, got {}",
                correlation_id, response_header.correlation_id
            )));
        }

        Resp::decode(&mut cursor, api_version)
            .map_err(|e| LinkError::Codec(format!("decode response: {e}")))
    }
}

// =============================================================================
// Topic Layout
// =============================================================================

/// Cached cluster view for the configured topic.
#[derive(Debug, Clone)]
struct TopicLayout {
    /// node id → `host:port`
    brokers: HashMap<i32, String>,
    /// partition index → leader node id, in partition order
    leaders: Vec<(i32, i32)>,
}

impl TopicLayout {
    fn from_metadata(topic: &str, metadata: &MetadataResponse) -> LinkResult<Self> {
        let brokers = metadata
            .brokers
            .iter()
            .map(|b| (b.node_id.0, format!("{}:{}", b.host.as_str(), b.port)))
            .collect();

        let entry = metadata
            .topics
            .iter()
            .find(|t| t.name.as_ref().map(|n| n.as_str()) == Some(topic))
            .ok_or_else(|| LinkError::NoLeader {
                topic: topic.to_string(),
                partition: -1,
            })?;

        if entry.error_code != 0 {
            return Err(LinkError::Broker {
                topic: topic.to_string(),
                partition: -1,
                code: entry.error_code,
            });
        }

        let mut leaders: Vec<(i32, i32)> = entry
            .partitions
            .iter()
            .map(|p| (p.partition_index, p.leader_id.0))
            .collect();
        leaders.sort_unstable();

        if leaders.is_empty() {
            return Err(LinkError::NoLeader {
                topic: topic.to_string(),
                partition: -1,
            });
        }

        Ok(TopicLayout { brokers, leaders })
    }

    fn leader_of(&self, partition: i32) -> Option<i32> {
        self.leaders
            .iter()
            .find(|(index, _)| *index == partition)
            .map(|(_, leader)| *leader)
            .filter(|leader| *leader >= 0)
    }
}

// =============================================================================
// Publisher
// =============================================================================

/// Publishes transaction events to one topic.
pub struct KafkaPublisher {
    config: ProducerConfig,
    layout: Option<TopicLayout>,
    connections: HashMap<i32, BrokerConnection>,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl KafkaPublisher {
    pub fn new(config: ProducerConfig) -> Self {
        KafkaPublisher {
            config,
            layout: None,
            connections: HashMap::new(),
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }

    /// Overrides the retry backoff bounds.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Fetches metadata eagerly so misconfiguration shows up at startup.
    pub async fn connect(&mut self) -> LinkResult<()> {
        self.refresh_metadata().await
    }

    /// Number of partitions in the cached layout.
    pub fn partition_count(&self) -> Option<usize> {
        self.layout.as_ref().map(|l| l.leaders.len())
    }

    /// Publishes one event and waits for the acknowledgement.
    pub async fn publish(&mut self, event: &TransactionEvent) -> LinkResult<PublishAck> {
        let key = Bytes::copy_from_slice(event.key().as_bytes());
        let value = Bytes::from(serde_json::to_vec(event)?);
        let timestamp = event.event_timestamp.timestamp_millis();

        let max_attempts = self.config.publish_retries + 1;
        let mut backoff = self.create_backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let err = match self.try_publish(&key, &value, timestamp).await {
                Ok(ack) => return Ok(ack),
                Err(e) => e,
            };

            self.discard_state_after(&err);

            if !err.is_retryable() {
                return Err(err);
            }
            if attempt >= max_attempts {
                return Err(LinkError::RetriesExhausted {
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }

            let delay = backoff.next_backoff().unwrap_or(self.max_backoff);
            warn!(
                error = %err,
                attempt,
                max_attempts,
                ?delay,
                "Publish failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Every publish is acknowledged before `publish` returns, so nothing
    /// is ever pending.
    pub async fn flush(&mut self) -> LinkResult<()> {
        debug!(topic = %self.config.topic, "Flush: no pending publishes");
        Ok(())
    }

    /// Drops all broker connections and the cached layout.
    pub fn close(&mut self) {
        let open = self.connections.len();
        self.connections.clear();
        self.layout = None;
        info!(connections = open, "Kafka publisher closed");
    }

    async fn try_publish(&mut self, key: &Bytes, value: &Bytes, timestamp: i64) -> LinkResult<PublishAck> {
        if self.layout.is_none() {
            self.refresh_metadata().await?;
        }
        let layout = self.layout.as_ref().ok_or_else(|| LinkError::NoLeader {
            topic: self.config.topic.clone(),
            partition: -1,
        })?;

        let partition = partition_for_key(key, layout.leaders.len());
        let leader = layout.leader_of(partition).ok_or_else(|| LinkError::NoLeader {
            topic: self.config.topic.clone(),
            partition,
        })?;
        let leader_addr = layout.brokers.get(&leader).cloned().ok_or_else(|| {
            LinkError::NoLeader {
                topic: self.config.topic.clone(),
                partition,
            }
        })?;

        let records = encode_record(key.clone(), value.clone(), timestamp)?;
        let request = ProduceRequest::default()
            .with_acks(ACKS_ALL)
            .with_timeout_ms(self.config.request_timeout.as_millis() as i32)
            .with_topic_data(vec![TopicProduceData::default()
                .with_name(TopicName(StrBytes::from_string(self.config.topic.clone())))
                .with_partition_data(vec![PartitionProduceData::default()
                    .with_index(partition)
                    .with_records(Some(records))])]);

        let request_timeout = self.config.request_timeout;
        let connection = self.connection_for(leader, &leader_addr).await?;
        let response: ProduceResponse = connection
            .send(ApiKey::Produce, PRODUCE_VERSION, &request, request_timeout)
            .await?;

        let result = response
            .responses
            .iter()
            .filter(|t| t.name.as_str() == self.config.topic)
            .flat_map(|t| t.partition_responses.iter())
            .find(|p| p.index == partition)
            .ok_or_else(|| LinkError::Codec("produce response missing partition".into()))?;

        if result.error_code != 0 {
            return Err(LinkError::Broker {
                topic: self.config.topic.clone(),
                partition,
                code: result.error_code,
            });
        }

        Ok(PublishAck {
            topic: self.config.topic.clone(),
            partition,
            offset: result.base_offset,
        })
    }

    async fn connection_for(&mut self, node_id: i32, addr: &str) -> LinkResult<&mut BrokerConnection> {
        let stale = self
            .connections
            .get(&node_id)
            .map(|c| c.addr != addr)
            .unwrap_or(false);
        if stale {
            self.connections.remove(&node_id);
        }

        if !self.connections.contains_key(&node_id) {
            let conn =
                BrokerConnection::connect(addr, &self.config.client_id, self.config.connect_timeout)
                    .await?;
            self.connections.insert(node_id, conn);
        }

        self.connections
            .get_mut(&node_id)
            .ok_or_else(|| LinkError::ConnectionFailed(addr.to_string()))
    }

    async fn refresh_metadata(&mut self) -> LinkResult<()> {
        let request = MetadataRequest::default()
            .with_topics(Some(vec![MetadataRequestTopic::default().with_name(Some(
                TopicName(StrBytes::from_string(self.config.topic.clone())),
            ))]))
            .with_allow_auto_topic_creation(true);

        let servers = self.config.bootstrap_servers.clone();
        let mut last_error = None;
        for server in &servers {
            let attempt = async {
                let mut conn = BrokerConnection::connect(
                    server,
                    &self.config.client_id,
                    self.config.connect_timeout,
                )
                .await?;
                conn.send::<_, MetadataResponse>(
                    ApiKey::Metadata,
                    METADATA_VERSION,
                    &request,
                    self.config.request_timeout,
                )
                .await
            };

            match attempt.await {
                Ok(metadata) => {
                    let layout = TopicLayout::from_metadata(&self.config.topic, &metadata)?;
                    debug!(
                        server = %server,
                        topic = %self.config.topic,
                        partitions = layout.leaders.len(),
                        brokers = layout.brokers.len(),
                        "Metadata refreshed"
                    );
                    self.layout = Some(layout);
                    return Ok(());
                }
                Err(e) => {
                    warn!(server = %server, error = %e, "Bootstrap server unavailable");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            LinkError::InvalidConfig("no bootstrap servers configured".into())
        }))
    }

    /// Forgets whatever the error shows to be untrustworthy.
    fn discard_state_after(&mut self, err: &LinkError) {
        if err.needs_metadata_refresh() {
            self.layout = None;
        }
        if matches!(
            err,
            LinkError::ConnectionFailed(_)
                | LinkError::Timeout(_)
                | LinkError::TimedOut(_)
                | LinkError::Codec(_)
        ) {
            self.connections.clear();
        }
    }

    fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_backoff,
            max_interval: self.max_backoff,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Encodes a single keyed record as a v2 record batch.
fn encode_record(key: Bytes, value: Bytes, timestamp: i64) -> LinkResult<Bytes> {
    let record = Record {
        transactional: false,
        control: false,
        partition_leader_epoch: 0,
        producer_id: -1,
        producer_epoch: -1,
        timestamp_type: TimestampType::Creation,
        offset: 0,
        sequence: -1,
        timestamp,
        key: Some(key),
        value: Some(value),
        headers: Default::default(),
    };

    let options = RecordEncodeOptions {
        version: 2,
        compression: Compression::None,
    };

    let mut buf = BytesMut::new();
    RecordBatchEncoder::encode_with_custom_compression::<_, _, CompressFn>(
        &mut buf,
        std::iter::once(&record),
        &options,
        None,
    )
    .map_err(|e| LinkError::Codec(format!("encode record batch: {e}")))?;

    Ok(buf.freeze())
}

// =============================================================================
// Unit Tests
// =============================================================================
