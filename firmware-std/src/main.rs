//! Firmware entry point: wires [`stationhub::system::System`] to real
//! ESP-IDF peripherals and runs the per-transport tasks spec.md §5's
//! scheduling table describes. Each task is a plain OS thread — ESP-IDF's
//! pthread shim maps these onto FreeRTOS tasks, so `thread::Builder`'s
//! `name`/`stack_size` already gives the task name and stack sizing the
//! table calls for; core pinning and priority are left at ESP-IDF's
//! pthread-config defaults.

mod peripherals;

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};
use esp_idf_svc::ota::EspOta;

use esp32_nimble::utilities::mutex::Mutex as NimbleMutex;
use esp32_nimble::{uuid128, BLEAdvertisementData, BLECharacteristic, BLEDevice, NimbleProperties};

use ws2812_esp32_rmt_driver::Ws2812Esp32RmtDriver;

use stationhub::ble::{self, BleAuth, GattReassembler, IndicateResult, ReceiveOutcome, SendOutcome};
use stationhub::board::SENSOR_POLL_INTERVAL_MS;
use stationhub::command::CommandTable;
use stationhub::commands::TABLE;
use stationhub::config::ConfigStore;
use stationhub::console::ConsoleEditor;
use stationhub::dispatcher::dispatch_one;
use stationhub::display::NullDisplayController;
use stationhub::fs::MemoryBlobStore;
use stationhub::i2c::{I2cRegistry, Module};
use stationhub::logring::LogRing;
use stationhub::notify::Notification;
use stationhub::queue;
use stationhub::sensor::{self, SensorDriver};
use stationhub::sensors::{humidity, light, pressure, temperature};
use stationhub::system::{System, SystemDeps};
use stationhub::tcp;
use stationhub::transport::{InboundMessage, Origin, OriginAddress, OutboundMessage};
use stationhub::udp;

use peripherals::{
    take_io_pins, EspFlashWriter, EspGpioAccess, EspHeapInfo, EspI2cController,
    EspNotificationLed, EspPartitionTable, NvsConfigBackend, RtcLogStore,
};

/// 16-bit Bluetooth SIG short UUIDs expanded against the Bluetooth Base
/// UUID, as `uuid128!` takes a literal rather than a computed string.
const BLE_SERVICE_UUID: &str = "0000abf0-0000-1000-8000-00805f9b34fb";
const BLE_DATA_CHARACTERISTIC_UUID: &str = "0000abf1-0000-1000-8000-00805f9b34fb";
const BLE_KEY_CHARACTERISTIC_UUID: &str = "0000abf2-0000-1000-8000-00805f9b34fb";

/// Every compiled-in driver, tried in a fixed order each time a bus is
/// swept. Built fresh per `(module, bus)` pair since a `SensorDriver` is
/// consumed once it's either claimed or rejected.
fn candidate_drivers() -> Vec<Box<dyn SensorDriver>> {
    vec![
        Box::new(light::AutoRangingLightDriver::new(light::Bh1750)),
        Box::new(light::AutoRangingLightDriver::new(light::Opt3001)),
        Box::new(light::AutoRangingLightDriver::new(light::Max44009)),
        Box::new(light::AutoRangingLightDriver::new(light::Tsl2561)),
        Box::new(light::AutoRangingLightDriver::new(light::Veml7700)),
        Box::new(light::AutoRangingLightDriver::new(light::Apds9930)),
        Box::new(light::AutoRangingLightDriver::new(light::Apds9960)),
        Box::new(light::AutoRangingLightDriver::new(light::Tsl2591)),
        Box::new(temperature::Tmp75Driver::new()),
        Box::new(humidity::Sht3xDriver::new()),
        Box::new(humidity::Am2320Driver::new()),
        Box::new(humidity::SimpleHumidityDriver::new(&humidity::AHT20_PROFILE)),
        Box::new(humidity::SimpleHumidityDriver::new(&humidity::AHT10_PROFILE)),
        Box::new(humidity::SimpleHumidityDriver::new(&humidity::HDC1080_PROFILE)),
        Box::new(humidity::SimpleHumidityDriver::new(&humidity::HTU21_PROFILE)),
        Box::new(pressure::Bmx280Driver::new()),
        Box::new(pressure::Bme680Driver::new()),
    ]
}

fn command_table() -> &'static CommandTable {
    &TABLE
}

/// Bluetooth MAC used to derive the key characteristic's expected
/// challenge token (spec.md §4.3.1).
fn device_mac() -> [u8; 6] {
    let mut mac = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_read_mac(mac.as_mut_ptr(), esp_idf_svc::sys::esp_mac_type_t_ESP_MAC_BT);
    }
    mac
}

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    let peripherals = Peripherals::take()?;
    let _sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let i2c_main0 = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &I2cConfig::new().baudrate(400.kHz().into()),
    )?;

    let io_pins = take_io_pins(
        peripherals.pins.gpio4,
        peripherals.pins.gpio5,
        peripherals.pins.gpio6,
        peripherals.pins.gpio7,
        peripherals.pins.gpio15,
        peripherals.pins.gpio16,
        peripherals.pins.gpio17,
        peripherals.pins.gpio18,
    );

    let mut i2c = I2cRegistry::new();
    i2c.init_module(Module::Main0, Box::new(EspI2cController::new(i2c_main0)), 400)?;

    let config_nvs = EspNvs::new(nvs.clone(), "stationhub", true)?;

    let deps = SystemDeps {
        command_table: command_table(),
        i2c,
        config: ConfigStore::new(Box::new(NvsConfigBackend::new(config_nvs))),
        log: LogRing::boot(Box::new(RtcLogStore::new()), unsafe { esp_idf_svc::sys::esp_random() }),
        led: Box::new(EspNotificationLed::new(Ws2812Esp32RmtDriver::new(
            0,
            peripherals.pins.gpio48.into(),
        )?)),
        flash_writer: Box::new(EspFlashWriter::new(EspOta::new()?)),
        partition_table: Box::new(EspPartitionTable::new(EspOta::new()?)),
        display: Box::new(NullDisplayController::new()),
        // A dedicated NVS-backed blob store would collide with the config
        // namespace's own `blob.*` keys under the same partition; the
        // in-memory store is the supplementary blob surface until a
        // second NVS partition is carved out for it (see DESIGN.md).
        blobs: Box::new(MemoryBlobStore::new(96 * 1024)),
        gpio: Box::new(EspGpioAccess::new(io_pins)),
        heap: Box::new(EspHeapInfo),
    };

    let system = Arc::new(System::new(deps));

    // Startup sensor detection sweep (spec.md §4.5): every compiled-in
    // module gets every mux-reachable bus probed once at boot.
    {
        let mut i2c = system.i2c.lock().unwrap();
        let mut sensors = system.sensors.lock().unwrap();
        for module in [Module::Main0] {
            let buses = i2c.buses(module);
            for bus in 0..buses {
                let _ = sensors.detect_bus(&mut i2c, module, bus, candidate_drivers());
            }
        }
    }

    let (inbound_tx, inbound_rx) = queue::bounded::<InboundMessage>();
    let (outbound_tx, outbound_rx) = queue::bounded::<OutboundMessage>();

    spawn_dispatcher(system.clone(), inbound_rx, outbound_tx);
    spawn_send_task(system.clone(), outbound_rx);
    spawn_console(system.clone(), inbound_tx.clone());
    spawn_tcp(system.clone(), inbound_tx.clone());
    spawn_udp(system.clone(), inbound_tx.clone());
    spawn_ble(system.clone(), inbound_tx);
    spawn_sensor_poller(system.clone());
    spawn_notification_led(system.clone());

    system.notifier.lock().unwrap().notify(Notification::SysBooting);

    loop {
        thread::sleep(Duration::from_secs(60));
    }
}

fn spawn_dispatcher(
    system: Arc<System>,
    inbound: queue::QueueReceiver<InboundMessage>,
    outbound: queue::QueueSender<OutboundMessage>,
) {
    thread::Builder::new()
        .name("sh-dispatch".into())
        .stack_size(4096)
        .spawn(move || loop {
            let Ok(message) = inbound.pop() else { break };
            let response = dispatch_one(&system, message);
            if outbound.push(response).is_err() {
                break;
            }
        })
        .expect("spawn dispatcher");
}

/// The single live TCP connection this board ever holds (spec.md §4.3.3).
static TCP_STREAM: Mutex<Option<TcpStream>> = Mutex::new(None);
static UDP_SOCKET: std::sync::OnceLock<std::net::UdpSocket> = std::sync::OnceLock::new();
static BLE_DATA_CHARACTERISTIC: std::sync::OnceLock<Arc<NimbleMutex<BLECharacteristic>>> =
    std::sync::OnceLock::new();

/// The single outbound consumer: routes each reply to the transport named
/// by its origin tag (spec.md §2).
fn spawn_send_task(system: Arc<System>, outbound: queue::QueueReceiver<OutboundMessage>) {
    thread::Builder::new()
        .name("sh-send".into())
        .stack_size(4096)
        .spawn(move || loop {
            let Ok(message) = outbound.pop() else { break };
            match message.origin_address.clone() {
                OriginAddress::Tcp { .. } => {
                    let mut guard = TCP_STREAM.lock().unwrap();
                    if let Some(stream) = guard.as_mut() {
                        if tcp::send_message(stream, &message).is_err() {
                            system.bump_stats(Origin::Tcp, |s| s.send_errors += 1);
                            *guard = None;
                        }
                    }
                }
                OriginAddress::Udp { peer } => {
                    if let Some(socket) = UDP_SOCKET.get() {
                        if udp::send_message(socket, &message, peer).is_err() {
                            system.bump_stats(Origin::Udp, |s| s.send_errors += 1);
                        }
                    }
                }
                OriginAddress::Console { .. } => {
                    let mut stdout = std::io::stdout();
                    let _ = stdout.write_all(&message.payload);
                    let _ = stdout.flush();
                }
                OriginAddress::Ble { .. } => send_ble_reply(&system, &message),
                OriginAddress::Script { .. } => {}
            }
        })
        .expect("spawn send task");
}

fn send_ble_reply(system: &Arc<System>, message: &OutboundMessage) {
    let Some(characteristic) = BLE_DATA_CHARACTERISTIC.get() else { return };
    for chunk in ble::fragment(&message.payload, message.mtu) {
        let characteristic = characteristic.clone();
        let outcome = ble::send_with_retry(
            &chunk,
            |bytes| {
                let mut chr = characteristic.lock();
                chr.set_value(bytes);
                chr.indicate();
                IndicateResult::Ok
            },
            |ms| thread::sleep(Duration::from_millis(ms as u64)),
        );
        match outcome {
            SendOutcome::Sent => {}
            SendOutcome::RetriesExhausted => {
                system.bump_stats(Origin::Ble, |s| s.indication_timeout += 1);
                break;
            }
            SendOutcome::Errored => {
                system.bump_stats(Origin::Ble, |s| s.indication_error += 1);
                break;
            }
        }
    }
}

fn spawn_console(system: Arc<System>, inbound: queue::QueueSender<InboundMessage>) {
    thread::Builder::new()
        .name("sh-console".into())
        .stack_size(3072)
        .spawn(move || {
            let mut editor = ConsoleEditor::new(&system.hostname());
            let mut stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            let _ = stdout.write_all(editor.prompt().as_bytes());
            let _ = stdout.flush();
            let mut byte = [0u8; 1];
            loop {
                if stdin.read_exact(&mut byte).is_err() {
                    thread::sleep(Duration::from_millis(20));
                    continue;
                }
                let outcome = editor.feed(byte[0]);
                let _ = stdout.write_all(&outcome.echo);
                let _ = stdout.flush();
                if let Some(line) = outcome.submit {
                    let message = InboundMessage {
                        origin: Origin::Console,
                        mtu: 512,
                        packetised: false,
                        payload: line.into_bytes(),
                        oob: Vec::new(),
                        origin_address: OriginAddress::Console { slot: 0 },
                    };
                    if inbound.push(message).is_err() {
                        break;
                    }
                }
            }
        })
        .expect("spawn console");
}

fn spawn_tcp(_system: Arc<System>, inbound: queue::QueueSender<InboundMessage>) {
    thread::Builder::new()
        .name("sh-tcp".into())
        .stack_size(2048)
        .spawn(move || {
            let listener = tcp::listener().expect("bind tcp listener");
            loop {
                let Ok((stream, peer)) = listener.accept() else { continue };
                *TCP_STREAM.lock().unwrap() = stream.try_clone().ok();
                let mut stream = stream;
                loop {
                    match tcp::read_message(&mut stream, peer) {
                        Ok(Some(message)) => {
                            if inbound.push(message).is_err() {
                                return;
                            }
                        }
                        Ok(None) => continue,
                        Err(_) => break,
                    }
                }
                *TCP_STREAM.lock().unwrap() = None;
            }
        })
        .expect("spawn tcp");
}

fn spawn_udp(system: Arc<System>, inbound: queue::QueueSender<InboundMessage>) {
    thread::Builder::new()
        .name("sh-udp".into())
        .stack_size(4096)
        .spawn(move || {
            let socket = udp::socket().expect("bind udp socket");
            let _ = UDP_SOCKET.set(socket);
            let socket = UDP_SOCKET.get().unwrap();
            loop {
                match udp::recv_one(socket) {
                    Ok(udp::RecvOutcome::Message(message)) => {
                        if inbound.push(message).is_err() {
                            return;
                        }
                    }
                    Ok(udp::RecvOutcome::IncompletePacketDropped) => {
                        system.bump_stats(Origin::Udp, |s| s.receive_incomplete_packets += 1);
                    }
                    Err(_) => {}
                }
            }
        })
        .expect("spawn udp");
}

/// BLE GATT server (spec.md §4.3.1, §6.3): one service, a write+indicate
/// data characteristic carrying command traffic, a write-only key
/// characteristic carrying the authentication challenge.
fn spawn_ble(system: Arc<System>, inbound: queue::QueueSender<InboundMessage>) {
    let device = BLEDevice::take();
    let advertising = device.get_advertising();
    let server = device.get_server();

    let auth = Arc::new(Mutex::new(BleAuth::new(device_mac())));
    let reassembler = Arc::new(Mutex::new(GattReassembler::new()));

    server.on_connect(move |server, desc| {
        let _ = server.update_conn_params(desc.conn_handle(), 24, 48, 0, 60);
    });
    {
        let auth = auth.clone();
        let advertising = advertising.clone();
        server.on_disconnect(move |_desc, _reason| {
            auth.lock().unwrap().on_disconnect();
            let _ = advertising.lock().start();
        });
    }

    let service = server.create_service(uuid128!(BLE_SERVICE_UUID));

    let data_characteristic = service.lock().create_characteristic(
        uuid128!(BLE_DATA_CHARACTERISTIC_UUID),
        NimbleProperties::WRITE | NimbleProperties::INDICATE,
    );
    let _ = BLE_DATA_CHARACTERISTIC.set(data_characteristic.clone());

    data_characteristic.lock().on_write({
        let auth = auth.clone();
        let reassembler = reassembler.clone();
        let inbound = inbound.clone();
        let system = system.clone();
        move |args| {
            if !auth.lock().unwrap().authorized() {
                system.bump_stats(Origin::Ble, |s| s.unauthorized_access += 1);
                return;
            }
            let outcome = reassembler.lock().unwrap().on_write(args.recv_data());
            if let ReceiveOutcome::Submit { packetised, bytes } = outcome {
                let message = InboundMessage {
                    origin: Origin::Ble,
                    mtu: 185,
                    packetised,
                    payload: bytes,
                    oob: Vec::new(),
                    origin_address: OriginAddress::Ble { connection_handle: 0 },
                };
                let _ = inbound.push(message);
            }
        }
    });

    let key_characteristic = service
        .lock()
        .create_characteristic(uuid128!(BLE_KEY_CHARACTERISTIC_UUID), NimbleProperties::WRITE);
    key_characteristic.lock().on_write({
        let auth = auth.clone();
        move |args| {
            if let Ok(ciphertext) = <[u8; 16]>::try_from(args.recv_data()) {
                auth.lock().unwrap().on_key_write(&ciphertext);
            }
        }
    });

    let _ = advertising.lock().set_data(
        BLEAdvertisementData::new()
            .name(&system.hostname())
            .add_service_uuid(uuid128!(BLE_SERVICE_UUID)),
    );
    let _ = advertising.lock().start();

    // Defragmentation timer: ticks the reassembly buffer's 10s timeout
    // (spec.md §4.3.1) independently of whatever writes arrive.
    thread::Builder::new()
        .name("sh-ble-defrag".into())
        .stack_size(2048)
        .spawn(move || loop {
            thread::sleep(Duration::from_millis(250));
            if reassembler.lock().unwrap().advance(250) {
                system.bump_stats(Origin::Ble, |s| s.defragmentation_timeouts += 1);
            }
        })
        .expect("spawn ble defrag timer");
}

fn spawn_sensor_poller(system: Arc<System>) {
    thread::Builder::new()
        .name("sh-sensor".into())
        .stack_size(3072)
        .spawn(move || loop {
            thread::sleep(Duration::from_millis(SENSOR_POLL_INTERVAL_MS));
            let mut i2c = system.i2c.lock().unwrap();
            let mut sensors = system.sensors.lock().unwrap();
            sensors.poll_once(&mut i2c, sensor::now_unix());
        })
        .expect("spawn sensor poller");
}

fn spawn_notification_led(system: Arc<System>) {
    thread::Builder::new()
        .name("sh-led".into())
        .stack_size(1536)
        .spawn(move || loop {
            let sleep_ms = {
                let mut notifier = system.notifier.lock().unwrap();
                let mut led = system.led.lock().unwrap();
                notifier.advance(&mut **led)
            };
            thread::sleep(Duration::from_millis(sleep_ms as u64));
        })
        .expect("spawn notification led");
}
