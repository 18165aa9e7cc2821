//! MQTT session to the broker over plain TCP
//!
//! One session is opened after the network comes up and held for the
//! lifetime of the telemetry loop. There is no reconnection: a broken
//! session surfaces as a publish error.

use aquamon_core::config::MqttConfig;
use aquamon_core::traits::Publish;
use embassy_net::{IpEndpoint, Stack, dns::DnsQueryType, tcp::TcpSocket};
use embassy_time::Duration;
use log::{error, info};
use rust_mqtt::{
    Bytes,
    buffer::BumpBuffer,
    client::{
        Client,
        options::{ConnectOptions, PublicationOptions, TopicReference},
    },
    config::{KeepAlive, SessionExpiryInterval},
    types::{MqttString, QoS, TopicName},
};
use static_cell::StaticCell;

use crate::network::NetworkError;

const MQTT_BUFFER_SIZE: usize = 1024;
const TCP_BUFFER_SIZE: usize = 1024;
const SOCKET_TIMEOUT_SECS: u64 = 30;

static MQTT_BUFFER: StaticCell<[u8; MQTT_BUFFER_SIZE]> = StaticCell::new();
static PACKET_BUFFER: StaticCell<BumpBuffer<'static>> = StaticCell::new();
static TCP_RX: StaticCell<[u8; TCP_BUFFER_SIZE]> = StaticCell::new();
static TCP_TX: StaticCell<[u8; TCP_BUFFER_SIZE]> = StaticCell::new();

type MqttClient = Client<'static, TcpSocket<'static>, BumpBuffer<'static>, 1, 1, 1, 0>;

/// Connected client, publishing at QoS 0
pub struct MqttSession {
    client: MqttClient,
}

impl MqttSession {
    /// Resolve the broker, open TCP and complete the MQTT handshake
    ///
    /// Can only be called once per boot; the buffers are static.
    pub async fn open(stack: Stack<'static>, config: &MqttConfig) -> Result<Self, NetworkError> {
        info!(
            "Connecting to MQTT broker at {}:{}",
            config.broker_host, config.broker_port
        );

        let host = config.broker_host;
        let address = stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|e| {
                error!("DNS query failed: {:?}", e);
                NetworkError::Dns { host }
            })?
            .first()
            .copied()
            .ok_or(NetworkError::Dns { host })?;

        let endpoint = IpEndpoint::new(address, config.broker_port);
        info!("Resolved {} to {}", host, endpoint);

        let mut socket = TcpSocket::new(
            stack,
            TCP_RX.init([0; TCP_BUFFER_SIZE]),
            TCP_TX.init([0; TCP_BUFFER_SIZE]),
        );
        socket.set_timeout(Some(Duration::from_secs(SOCKET_TIMEOUT_SECS)));
        socket.connect(endpoint).await.map_err(|e| {
            error!("TCP connect failed: {:?}", e);
            NetworkError::Connect
        })?;

        let buffer = PACKET_BUFFER.init(BumpBuffer::new(MQTT_BUFFER.init([0; MQTT_BUFFER_SIZE])));
        let mut client = MqttClient::new(buffer);

        let options = ConnectOptions {
            session_expiry_interval: SessionExpiryInterval::EndOnDisconnect,
            clean_start: true,
            keep_alive: match config.keep_alive_secs {
                0 => KeepAlive::Infinite,
                secs => KeepAlive::Seconds(secs),
            },
            will: None,
            user_name: None,
            password: None,
        };
        let client_id = MqttString::new(config.client_id.into()).map_err(|e| {
            error!("Invalid client id: {:?}", e);
            NetworkError::MqttConnect
        })?;

        client
            .connect(socket, &options, Some(client_id))
            .await
            .map_err(|e| {
                error!("MQTT connect failed: {:?}", e);
                NetworkError::MqttConnect
            })?;

        info!("MQTT connected as {}", config.client_id);
        Ok(Self { client })
    }
}

impl Publish for MqttSession {
    type Error = NetworkError;

    async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), Self::Error> {
        let topic = MqttString::new(topic.into()).map_err(|e| {
            error!("Invalid topic: {:?}", e);
            NetworkError::Publish
        })?;
        // SAFETY: the topic passed `MqttConfig::validate`, which rejects
        // empty topics, wildcards and NUL.
        let topic = unsafe { TopicName::new_unchecked(topic) };

        let options = PublicationOptions {
            retain: false,
            message_expiry_interval: None,
            topic: TopicReference::Name(topic),
            qos: QoS::AtMostOnce,
        };

        self.client
            .publish(&options, Bytes::from(payload))
            .await
            .map(|_| ())
            .map_err(|e| {
                error!("MQTT publish failed: {:?}", e);
                NetworkError::Publish
            })
    }
}
