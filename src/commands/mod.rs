//! The full `CommandTable` (spec.md §6.4): one [`crate::command::CommandDescriptor`]
//! per CLI command, grouped by subsystem module.

pub mod config;
pub mod display;
pub mod fs;
pub mod gpio;
pub mod help;
pub mod hostname;
pub mod i2c;
pub mod info;
pub mod log;
pub mod misc;
pub mod network;
pub mod ota;
pub mod process;
pub mod sensor;

use crate::command::{CommandDescriptor, CommandTable};

pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor {
        name: "alias",
        alias: None,
        help: "set or clear a command alias",
        parameters: help::ALIAS_PARAMS,
        function: help::alias,
    },
    CommandDescriptor {
        name: "bt-info",
        alias: None,
        help: "report BLE advertising/connection status",
        parameters: network::BT_INFO_PARAMS,
        function: network::bt_info,
    },
    CommandDescriptor {
        name: "config-dump",
        alias: None,
        help: "dump every persisted config key",
        parameters: config::CONFIG_DUMP_PARAMS,
        function: config::config_dump,
    },
    CommandDescriptor {
        name: "config-erase",
        alias: None,
        help: "erase a persisted config key (wildcard with trailing *)",
        parameters: config::CONFIG_ERASE_PARAMS,
        function: config::config_erase,
    },
    CommandDescriptor {
        name: "config-info",
        alias: None,
        help: "report config store capacity",
        parameters: config::CONFIG_INFO_PARAMS,
        function: config::config_info,
    },
    CommandDescriptor {
        name: "config-set-int",
        alias: None,
        help: "set a signed-integer config key",
        parameters: config::CONFIG_SET_INT_PARAMS,
        function: config::config_set_int,
    },
    CommandDescriptor {
        name: "config-set-uint",
        alias: None,
        help: "set an unsigned-integer config key",
        parameters: config::CONFIG_SET_UINT_PARAMS,
        function: config::config_set_uint,
    },
    CommandDescriptor {
        name: "config-set-string",
        alias: None,
        help: "set a string config key",
        parameters: config::CONFIG_SET_STRING_PARAMS,
        function: config::config_set_string,
    },
    CommandDescriptor {
        name: "config-show",
        alias: None,
        help: "show one persisted config key",
        parameters: config::CONFIG_SHOW_PARAMS,
        function: config::config_show,
    },
    CommandDescriptor {
        name: "console-info",
        alias: None,
        help: "report console line-editing limits",
        parameters: misc::CONSOLE_INFO_PARAMS,
        function: misc::console_info,
    },
    CommandDescriptor {
        name: "display-brightness",
        alias: None,
        help: "set display backlight brightness",
        parameters: display::DISPLAY_BRIGHTNESS_PARAMS,
        function: display::display_brightness,
    },
    CommandDescriptor {
        name: "display-configure",
        alias: None,
        help: "configure display rotation/page interval",
        parameters: display::DISPLAY_CONFIGURE_PARAMS,
        function: display::display_configure,
    },
    CommandDescriptor {
        name: "display-erase",
        alias: None,
        help: "remove every display page",
        parameters: display::DISPLAY_ERASE_PARAMS,
        function: display::display_erase,
    },
    CommandDescriptor {
        name: "display-info",
        alias: None,
        help: "report display configuration",
        parameters: display::DISPLAY_INFO_PARAMS,
        function: display::display_info,
    },
    CommandDescriptor {
        name: "display-page-add-text",
        alias: None,
        help: "append a text page",
        parameters: display::DISPLAY_PAGE_ADD_TEXT_PARAMS,
        function: display::display_page_add_text,
    },
    CommandDescriptor {
        name: "display-page-add-image",
        alias: None,
        help: "append an image page",
        parameters: display::DISPLAY_PAGE_ADD_IMAGE_PARAMS,
        function: display::display_page_add_image,
    },
    CommandDescriptor {
        name: "display-page-remove",
        alias: None,
        help: "remove a display page by index",
        parameters: display::DISPLAY_PAGE_REMOVE_PARAMS,
        function: display::display_page_remove,
    },
    CommandDescriptor {
        name: "fs-read",
        alias: None,
        help: "read bytes from a stored blob",
        parameters: fs::FS_READ_PARAMS,
        function: fs::fs_read,
    },
    CommandDescriptor {
        name: "fs-checksum",
        alias: None,
        help: "report a stored blob's CRC-32",
        parameters: fs::FS_CHECKSUM_PARAMS,
        function: fs::fs_checksum,
    },
    CommandDescriptor {
        name: "fs-erase",
        alias: None,
        help: "erase a stored blob",
        parameters: fs::FS_ERASE_PARAMS,
        function: fs::fs_erase,
    },
    CommandDescriptor {
        name: "fs-format",
        alias: None,
        help: "erase every stored blob",
        parameters: fs::FS_FORMAT_PARAMS,
        function: fs::fs_format,
    },
    CommandDescriptor {
        name: "fs-info",
        alias: None,
        help: "report blob store capacity usage",
        parameters: fs::FS_INFO_PARAMS,
        function: fs::fs_info,
    },
    CommandDescriptor {
        name: "fs-list",
        alias: None,
        help: "list every stored blob",
        parameters: fs::FS_LIST_PARAMS,
        function: fs::fs_list,
    },
    CommandDescriptor {
        name: "fs-write",
        alias: None,
        help: "write bytes to a stored blob",
        parameters: fs::FS_WRITE_PARAMS,
        function: fs::fs_write,
    },
    CommandDescriptor {
        name: "help",
        alias: Some("?"),
        help: "list every command",
        parameters: help::HELP_PARAMS,
        function: help::help,
    },
    CommandDescriptor {
        name: "hostname",
        alias: None,
        help: "report or set the device hostname",
        parameters: hostname::HOSTNAME_PARAMS,
        function: hostname::hostname,
    },
    CommandDescriptor {
        name: "i2c-info",
        alias: None,
        help: "report I2C module/bus/slave state",
        parameters: i2c::I2C_INFO_PARAMS,
        function: i2c::i2c_info,
    },
    CommandDescriptor {
        name: "i2c-speed",
        alias: None,
        help: "report or set an I2C module's bus speed",
        parameters: i2c::I2C_SPEED_PARAMS,
        function: i2c::i2c_speed,
    },
    CommandDescriptor {
        name: "info",
        alias: None,
        help: "report firmware identity and uptime",
        parameters: info::INFO_PARAMS,
        function: info::info,
    },
    CommandDescriptor {
        name: "info-board",
        alias: None,
        help: "report the board name",
        parameters: info::INFO_BOARD_PARAMS,
        function: info::info_board,
    },
    CommandDescriptor {
        name: "info-cli",
        alias: None,
        help: "report the command table size",
        parameters: info::INFO_CLI_PARAMS,
        function: info::info_cli,
    },
    CommandDescriptor {
        name: "info-memory",
        alias: None,
        help: "report free heap and largest free block",
        parameters: info::INFO_MEMORY_PARAMS,
        function: info::info_memory,
    },
    CommandDescriptor {
        name: "info-partitions",
        alias: None,
        help: "list flash partitions",
        parameters: info::INFO_PARTITIONS_PARAMS,
        function: info::info_partitions,
    },
    CommandDescriptor {
        name: "io-dump",
        alias: None,
        help: "dump every GPIO pin's state",
        parameters: gpio::IO_DUMP_PARAMS,
        function: gpio::io_dump,
    },
    CommandDescriptor {
        name: "io-read",
        alias: None,
        help: "read one GPIO pin",
        parameters: gpio::IO_READ_PARAMS,
        function: gpio::io_read,
    },
    CommandDescriptor {
        name: "io-stats",
        alias: None,
        help: "report GPIO access counters",
        parameters: gpio::IO_STATS_PARAMS,
        function: gpio::io_stats,
    },
    CommandDescriptor {
        name: "io-write",
        alias: None,
        help: "write one GPIO pin",
        parameters: gpio::IO_WRITE_PARAMS,
        function: gpio::io_write,
    },
    CommandDescriptor {
        name: "ipv6-slaac",
        alias: None,
        help: "report the SLAAC IPv6 address",
        parameters: network::IPV6_SLAAC_PARAMS,
        function: network::ipv6_slaac,
    },
    CommandDescriptor {
        name: "ipv6-static",
        alias: None,
        help: "report or set the static IPv6 address",
        parameters: network::IPV6_STATIC_PARAMS,
        function: network::ipv6_static,
    },
    CommandDescriptor {
        name: "log",
        alias: None,
        help: "dump the persistent log ring",
        parameters: log::LOG_PARAMS,
        function: log::log,
    },
    CommandDescriptor {
        name: "log-clear",
        alias: None,
        help: "clear the persistent log ring",
        parameters: log::LOG_CLEAR_PARAMS,
        function: log::log_clear,
    },
    CommandDescriptor {
        name: "log-info",
        alias: None,
        help: "report log ring occupancy",
        parameters: log::LOG_INFO_PARAMS,
        function: log::log_info,
    },
    CommandDescriptor {
        name: "log-monitor",
        alias: None,
        help: "toggle console echo of new log entries",
        parameters: log::LOG_MONITOR_PARAMS,
        function: log::log_monitor,
    },
    CommandDescriptor {
        name: "ota-start",
        alias: None,
        help: "begin an OTA update session",
        parameters: ota::OTA_START_PARAMS,
        function: ota::ota_start,
    },
    CommandDescriptor {
        name: "ota-write",
        alias: None,
        help: "write one OTA chunk",
        parameters: ota::OTA_WRITE_PARAMS,
        function: ota::ota_write,
    },
    CommandDescriptor {
        name: "ota-finish",
        alias: None,
        help: "finish writing and report the running hash",
        parameters: ota::OTA_FINISH_PARAMS,
        function: ota::ota_finish,
    },
    CommandDescriptor {
        name: "ota-commit",
        alias: None,
        help: "commit the written image against an expected hash",
        parameters: ota::OTA_COMMIT_PARAMS,
        function: ota::ota_commit,
    },
    CommandDescriptor {
        name: "ota-confirm",
        alias: None,
        help: "confirm the committed image is good",
        parameters: ota::OTA_CONFIRM_PARAMS,
        function: ota::ota_confirm,
    },
    CommandDescriptor {
        name: "process-list",
        alias: Some("ps"),
        help: "list every pinned system task",
        parameters: process::PROCESS_LIST_PARAMS,
        function: process::process_list,
    },
    CommandDescriptor {
        name: "process-stop",
        alias: Some("kill"),
        help: "attempt to stop a system task",
        parameters: process::PROCESS_STOP_PARAMS,
        function: process::process_stop,
    },
    CommandDescriptor {
        name: "reset",
        alias: None,
        help: "reboot the device",
        parameters: misc::RESET_PARAMS,
        function: misc::reset,
    },
    CommandDescriptor {
        name: "run",
        alias: None,
        help: "replay a stored script blob as commands",
        parameters: misc::RUN_PARAMS,
        function: misc::run,
    },
    CommandDescriptor {
        name: "sensor-dump",
        alias: None,
        help: "dump every detected sensor's last reading",
        parameters: sensor::SENSOR_DUMP_PARAMS,
        function: sensor::sensor_dump,
    },
    CommandDescriptor {
        name: "sensor-info",
        alias: None,
        help: "list every detected sensor's identity and state",
        parameters: sensor::SENSOR_INFO_PARAMS,
        function: sensor::sensor_info,
    },
    CommandDescriptor {
        name: "sensor-json",
        alias: None,
        help: "dump every detected sensor's last reading as JSON",
        parameters: sensor::SENSOR_JSON_PARAMS,
        function: sensor::sensor_json,
    },
    CommandDescriptor {
        name: "sensor-stats",
        alias: None,
        help: "report sensor poll counters",
        parameters: sensor::SENSOR_STATS_PARAMS,
        function: sensor::sensor_stats,
    },
    CommandDescriptor {
        name: "wlan-client-config",
        alias: None,
        help: "persist wlan client ssid/password",
        parameters: network::WLAN_CLIENT_CONFIG_PARAMS,
        function: network::wlan_client_config,
    },
    CommandDescriptor {
        name: "wlan-info",
        alias: None,
        help: "report wlan connection status",
        parameters: network::WLAN_INFO_PARAMS,
        function: network::wlan_info,
    },
    CommandDescriptor {
        name: "wlan-ip-info",
        alias: None,
        help: "report wlan IPv4/IPv6 addresses",
        parameters: network::WLAN_IP_INFO_PARAMS,
        function: network::wlan_ip_info,
    },
    CommandDescriptor {
        name: "write",
        alias: None,
        help: "raw diagnostic I2C write",
        parameters: misc::WRITE_PARAMS,
        function: misc::write,
    },
];

pub static TABLE: CommandTable = CommandTable { commands: COMMANDS };
