mod reading;

use chrono::Utc;
use clap::Parser;
use rand::Rng;
use reading::SoilReading;
use rumqttc::{AsyncClient, MqttOptions, QoS};
use std::time::Duration;
use tracing::{error, info, warn};

/// Stands in for the ESP32 soil probe by overwriting the reading document
#[derive(Debug, Parser)]
#[command(name = "simulator")]
struct Args {
    #[arg(long, env = "MQTT_BROKER", default_value = "localhost")]
    broker: String,

    #[arg(long, env = "MQTT_PORT", default_value_t = 1883)]
    port: u16,

    #[arg(long, env = "APP_ID", default_value = "default-app-id")]
    app_id: String,

    /// Milliseconds between readings
    #[arg(long, env = "RATE_MS", default_value_t = 5000)]
    rate_ms: u64,

    #[arg(long, env = "DEVICE_ID", default_value = "esp32-sim")]
    device_id: String,

    /// Sent as the MQTT password
    #[arg(long, env = "AUTH_TOKEN")]
    auth_token: Option<String>,

    /// Stop after this many readings, 0 runs forever
    #[arg(long, default_value_t = 0)]
    count: u64,

    /// Delete the document and exit
    #[arg(long)]
    clear: bool,
}

/// Same layout as the dashboard's `DocumentPath` for `latest_reading`
fn document_topic(app_id: &str) -> String {
    format!(
        "artifacts/{}/public/data/soil_readings/latest_reading",
        app_id
    )
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let topic = document_topic(&args.app_id);
    info!("Starting soil probe simulator");
    info!(
        "Broker: {}:{}, Topic: {}, Interval: {}ms",
        args.broker, args.port, topic, args.rate_ms
    );

    let client_id = format!("sim-{}", uuid::Uuid::new_v4());
    let mut mqtt_options = MqttOptions::new(&client_id, &args.broker, args.port);
    mqtt_options.set_keep_alive(Duration::from_secs(30));
    mqtt_options.set_clean_session(true);
    if let Some(token) = &args.auth_token {
        mqtt_options.set_credentials(&client_id, token);
    }

    let (client, mut eventloop) = AsyncClient::new(mqtt_options, 100);

    // Spawn eventloop handler
    tokio::spawn(async move {
        loop {
            if let Err(e) = eventloop.poll().await {
                error!("MQTT eventloop error: {}", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    });

    if args.clear {
        match client
            .publish(&topic, QoS::AtLeastOnce, true, Vec::<u8>::new())
            .await
        {
            Ok(()) => info!("Cleared {}", topic),
            Err(e) => error!("Failed to clear document: {}", e),
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
        return;
    }

    let mut rng = rand::thread_rng();
    let mut published = 0u64;
    let mut ticker = tokio::time::interval(Duration::from_millis(args.rate_ms.max(1)));

    loop {
        ticker.tick().await;

        let reading = generate_reading(&mut rng, args.device_id.clone());
        let payload = match serde_json::to_vec(&reading) {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to serialize reading: {}", e);
                continue;
            }
        };

        match client.publish(&topic, QoS::AtLeastOnce, true, payload).await {
            Ok(()) => {
                published += 1;
                info!(
                    "Published reading {}: N={:.0} P={:.0} K={:.0} pH={:.1} {:.1}C {:.0}%",
                    published,
                    reading.n,
                    reading.p,
                    reading.k,
                    reading.ph,
                    reading.temperature,
                    reading.humidity
                );
            }
            Err(e) => {
                warn!("Failed to publish: {}", e);
            }
        }

        if args.count > 0 && published >= args.count {
            // let the eventloop flush the last publish
            tokio::time::sleep(Duration::from_secs(1)).await;
            break;
        }
    }

    info!("Published {} readings, exiting", published);
}

fn generate_reading(rng: &mut impl Rng, device_id: String) -> SoilReading {
    let ph = if rng.gen_bool(0.05) {
        rng.gen_range(3.0..10.0) // 5% outliers
    } else {
        rng.gen_range(5.0..8.0)
    };

    let temperature = if rng.gen_bool(0.05) {
        rng.gen_range(-5.0..45.0) // 5% outliers
    } else {
        rng.gen_range(15.0..35.0)
    };

    let humidity = if rng.gen_bool(0.05) {
        rng.gen_range(0.0..100.0) // 5% outliers
    } else {
        rng.gen_range(40.0..90.0)
    };

    SoilReading {
        n: rng.gen_range(0.0..140.0_f64).round(),
        p: rng.gen_range(5.0..145.0_f64).round(),
        k: rng.gen_range(5.0..205.0_f64).round(),
        ph,
        temperature,
        humidity,
        timestamp: Utc::now(),
        device_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_matches_dashboard_path() {
        assert_eq!(
            document_topic("cropsense"),
            "artifacts/cropsense/public/data/soil_readings/latest_reading"
        );
    }

    #[test]
    fn test_generated_readings_in_sensor_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let r = generate_reading(&mut rng, "esp32-sim".to_string());
            assert!((0.0..=140.0).contains(&r.n));
            assert!((5.0..=145.0).contains(&r.p));
            assert!((5.0..=205.0).contains(&r.k));
            assert!((3.0..10.0).contains(&r.ph));
            assert!((-5.0..45.0).contains(&r.temperature));
            assert!((0.0..100.0).contains(&r.humidity));
        }
    }

    #[test]
    fn test_serialized_field_names() {
        let mut rng = rand::thread_rng();
        let r = generate_reading(&mut rng, "esp32-sim".to_string());
        let json = serde_json::to_value(&r).unwrap();

        for field in ["N", "P", "K", "ph", "temperature", "humidity", "timestamp", "deviceId"] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
    }
}
