//! MQTT ingestion. One connection per agent; device telemetry topics plus
//! the two shared event topics fan into the monitor, one message at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use std::{fs, io};

use rumqttc::tokio_rustls::rustls::{ClientConfig, RootCertStore};
use rumqttc::{
    AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, TlsConfiguration, Transport,
};
use rustls_pemfile::{Item, certs, read_one};
use tokio::sync::Mutex;

use fieldsync_api::models::{DeviceClass, DeviceId};

use crate::configs::{Bus, DeviceEntry};
use crate::errors::AgentError;
use crate::services::monitor::Monitor;
use crate::services::registry::AxisChannels;

#[derive(Default)]
struct Routes {
    by_topic: HashMap<String, Vec<DeviceId>>,
    by_device: HashMap<DeviceId, String>,
}

pub struct TelemetryService {
    client: AsyncClient,
    monitor: Arc<Mutex<Monitor>>,
    routes: Arc<Mutex<Routes>>,
    error_topic: String,
    ack_topic: String,
}

impl TelemetryService {
    /// Builds the bus connection. The returned event loop must be handed to
    /// [`TelemetryService::start`] before subscriptions make progress.
    pub fn new(bus: &Bus, monitor: Arc<Mutex<Monitor>>) -> Result<(Self, EventLoop), AgentError> {
        let mut options = MqttOptions::new(&bus.client_id, &bus.host, bus.port);
        options.set_keep_alive(Duration::from_secs(5));

        if let Some(auth) = &bus.auth {
            let mut root_cert_store = RootCertStore::empty();
            let native = rustls_native_certs::load_native_certs();
            for err in &native.errors {
                tracing::warn!(%err, "native certificate skipped");
            }
            root_cert_store.add_parsable_certificates(native.certs);

            let certs = certs(&mut io::BufReader::new(fs::File::open(&auth.cert_path)?))
                .collect::<Result<Vec<_>, _>>()?;
            let mut key_buffer = io::BufReader::new(fs::File::open(&auth.key_path)?);
            let key = loop {
                match read_one(&mut key_buffer)? {
                    Some(Item::Sec1Key(key)) => break key.into(),
                    Some(Item::Pkcs1Key(key)) => break key.into(),
                    Some(Item::Pkcs8Key(key)) => break key.into(),
                    None => {
                        return Err(AgentError::Tls(
                            "no usable key found, encrypted keys are not supported".into(),
                        ));
                    }
                    _ => {}
                }
            };

            let tls_config = ClientConfig::builder()
                .with_root_certificates(root_cert_store)
                .with_client_auth_cert(certs, key)
                .map_err(|err| AgentError::Tls(err.to_string()))?;

            options.set_transport(Transport::Tls(TlsConfiguration::from(tls_config)));
        }

        let (client, event_loop) = AsyncClient::new(options, 10);

        Ok((
            Self {
                client,
                monitor,
                routes: Arc::new(Mutex::new(Routes::default())),
                error_topic: bus.error_topic.clone(),
                ack_topic: bus.ack_topic.clone(),
            },
            event_loop,
        ))
    }

    /// Spawns the connection task. Every message is dispatched under the
    /// monitor lock, so the core observes the bus strictly one message at a
    /// time and in arrival order.
    pub fn start(&self, mut event_loop: EventLoop) {
        let monitor = self.monitor.clone();
        let routes = self.routes.clone();
        let error_topic = self.error_topic.clone();
        let ack_topic = self.ack_topic.clone();

        tokio::spawn(async move {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        let payload = match std::str::from_utf8(&publish.payload) {
                            Ok(text) => text.to_string(),
                            Err(_) => {
                                tracing::error!(topic = %publish.topic, "non UTF-8 payload dropped");
                                continue;
                            }
                        };
                        if publish.topic == error_topic {
                            monitor.lock().await.record_error(&payload);
                        } else if publish.topic == ack_topic {
                            monitor.lock().await.apply_ack_event(&payload);
                        } else {
                            let ids = routes
                                .lock()
                                .await
                                .by_topic
                                .get(&publish.topic)
                                .cloned()
                                .unwrap_or_default();
                            if ids.is_empty() {
                                tracing::debug!(topic = %publish.topic, "message on an unrouted topic");
                                continue;
                            }
                            let mut monitor = monitor.lock().await;
                            for id in ids {
                                monitor.apply_telemetry(id, &payload);
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::error!(%err, "bus connection error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }

    /// Binds a configured device and subscribes its telemetry topic. Topics
    /// shared by several devices are subscribed once.
    pub async fn bind_device(&self, entry: &DeviceEntry) -> Result<DeviceId, AgentError> {
        let id = {
            let mut monitor = self.monitor.lock().await;
            match entry.class {
                DeviceClass::Axis => monitor.bind_axis(
                    &entry.name,
                    AxisChannels {
                        axis_no: entry.axis_no,
                        move_no: entry.move_no,
                    },
                    entry.pose,
                ),
                DeviceClass::Valve => monitor.bind_valve(&entry.name, entry.function_no, entry.pose),
            }
        };

        let fresh_topic = {
            let mut routes = self.routes.lock().await;
            let fresh = !routes.by_topic.contains_key(&entry.topic);
            routes.by_topic.entry(entry.topic.clone()).or_default().push(id);
            routes.by_device.insert(id, entry.topic.clone());
            fresh
        };
        if fresh_topic {
            self.client.subscribe(&entry.topic, QoS::AtLeastOnce).await?;
        }

        tracing::info!(device = %entry.name, topic = %entry.topic, "device bound");
        Ok(id)
    }

    /// Releases a device. The route and subscription go first; by the time
    /// the registry entry disappears, no further message can resolve to it.
    pub async fn unbind_device(&self, id: DeviceId) -> Result<(), AgentError> {
        let stale_topic = {
            let mut routes = self.routes.lock().await;
            let Some(topic) = routes.by_device.remove(&id) else {
                return Ok(());
            };
            let drained = match routes.by_topic.get_mut(&topic) {
                Some(ids) => {
                    ids.retain(|bound| *bound != id);
                    ids.is_empty()
                }
                None => false,
            };
            if drained {
                routes.by_topic.remove(&topic);
                Some(topic)
            } else {
                None
            }
        };
        if let Some(topic) = stale_topic {
            self.client.unsubscribe(&topic).await?;
        }

        self.monitor.lock().await.unbind(id);
        Ok(())
    }

    /// Handles bound devices in no particular order.
    pub async fn bound_devices(&self) -> Vec<DeviceId> {
        self.routes.lock().await.by_device.keys().copied().collect()
    }
}
