// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed reads of the cached status and configuration.
//!
//! Accessors never perform I/O and never fail: a field the charger has not
//! reported (or reported with an unexpected type) reads as `None`.

use chrono::{DateTime, Utc};

use crate::charger::Charger;
use crate::state::DeviceState;
use crate::types::{ChargeMode, EvseState, FirmwareVersion, ServiceLevel};

/// Default lower bound of the charge current when the charger omits it.
const DEFAULT_MIN_AMPS: i64 = 6;

/// Default upper bound of the charge current when the charger omits it.
const DEFAULT_MAX_AMPS: i64 = 48;

/// Shaper value meaning "no limit, follow the pilot".
const SHAPER_UNLIMITED: i64 = 255;

/// Safety trip counters reported together in the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyCounts {
    /// Ground fault trips.
    pub gfci: i64,
    /// Missing ground trips.
    pub no_ground: i64,
    /// Stuck relay trips.
    pub stuck_relay: i64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Temperatures are reported in tenths of a degree; zero means no sensor.
fn tenths(state: &DeviceState, name: &str) -> Option<f64> {
    state
        .get_f64(name)
        .filter(|raw| *raw != 0.0)
        .map(|raw| raw / 10.0)
}

fn owned_str(state: &DeviceState, name: &str) -> Option<String> {
    state.get_str(name).map(str::to_string)
}

impl Charger {
    fn read_status<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        self.inner.status.read(f)
    }

    fn read_config<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        self.inner.config.read(f)
    }

    // ========== Status ==========

    /// Returns the status text, falling back to the name of the state code.
    #[must_use]
    pub fn status(&self) -> Option<String> {
        self.read_status(|s| {
            owned_str(s, "status").or_else(|| {
                EvseState::from_code(s.get_i64("state").unwrap_or(0))
                    .map(|state| state.as_str().to_string())
            })
        })
    }

    /// Returns the EVSE state.
    #[must_use]
    pub fn state(&self) -> Option<EvseState> {
        self.state_raw().and_then(EvseState::from_code)
    }

    /// Returns the raw EVSE state code.
    #[must_use]
    pub fn state_raw(&self) -> Option<i64> {
        self.read_status(|s| s.get_i64("state"))
    }

    /// Returns the charge current in amps; 0 when not charging.
    #[must_use]
    pub fn charging_current(&self) -> Option<f64> {
        self.read_status(|s| s.get_f64("amp"))
    }

    /// Returns the pilot current in amps.
    #[must_use]
    pub fn current_capacity(&self) -> Option<i64> {
        self.read_status(|s| s.get_i64("pilot"))
    }

    /// Returns the pilot voltage in volts.
    #[must_use]
    pub fn charging_voltage(&self) -> Option<f64> {
        self.read_status(|s| s.get_f64("voltage"))
    }

    /// Returns voltage times current, in watts, rounded to 2 decimals.
    #[must_use]
    pub fn charging_power(&self) -> Option<f64> {
        self.read_status(|s| Some(round2(s.get_f64("voltage")? * s.get_f64("amp")?)))
    }

    /// Returns the lifetime energy in Wh.
    #[must_use]
    pub fn usage_total(&self) -> Option<f64> {
        self.read_status(|s| s.get_f64("total_energy").or_else(|| s.get_f64("watthour")))
    }

    /// Returns the energy of the current session in Wh.
    ///
    /// Older firmware only reports watt-seconds, which are converted and
    /// rounded to 2 decimals.
    #[must_use]
    pub fn usage_session(&self) -> Option<f64> {
        self.read_status(|s| {
            s.get_f64("session_energy")
                .or_else(|| s.get_f64("wattsec").map(|ws| round2(ws / 3600.0)))
        })
    }

    /// Returns the ambient temperature in degrees Celsius.
    #[must_use]
    pub fn ambient_temperature(&self) -> Option<f64> {
        self.read_status(|s| {
            tenths(s, "temp").or_else(|| s.get_f64("temp1").map(|t| t / 10.0))
        })
    }

    /// Returns the real time clock temperature in degrees Celsius.
    #[must_use]
    pub fn rtc_temperature(&self) -> Option<f64> {
        self.read_status(|s| tenths(s, "temp2"))
    }

    /// Returns the IR sensor temperature in degrees Celsius.
    #[must_use]
    pub fn ir_temperature(&self) -> Option<f64> {
        self.read_status(|s| tenths(s, "temp3"))
    }

    /// Returns the gateway temperature in degrees Celsius.
    #[must_use]
    pub fn esp_temperature(&self) -> Option<f64> {
        self.read_status(|s| tenths(s, "temp4"))
    }

    /// Returns the WiFi signal strength in dBm.
    #[must_use]
    pub fn wifi_signal(&self) -> Option<i64> {
        self.read_status(|s| s.get_i64("srssi"))
    }

    /// Returns the gateway IP address.
    #[must_use]
    pub fn ip_address(&self) -> Option<String> {
        self.read_status(|s| owned_str(s, "ipaddress"))
    }

    /// Returns the network mode (`"STA"`, `"AP"`, ...).
    #[must_use]
    pub fn mode(&self) -> Option<String> {
        self.read_status(|s| owned_str(s, "mode"))
    }

    /// Returns whether the gateway is on a wired connection.
    #[must_use]
    pub fn using_ethernet(&self) -> bool {
        self.read_status(|s| s.is_truthy("eth_connected"))
    }

    /// Returns how often the stuck relay check tripped.
    #[must_use]
    pub fn stuck_relay_trip_count(&self) -> Option<i64> {
        self.read_status(|s| s.get_i64("stuckcount"))
    }

    /// Returns how often the ground check tripped.
    #[must_use]
    pub fn no_gnd_trip_count(&self) -> Option<i64> {
        self.read_status(|s| s.get_i64("nogndcount"))
    }

    /// Returns how often the GFCI tripped.
    #[must_use]
    pub fn gfi_trip_count(&self) -> Option<i64> {
        self.read_status(|s| s.get_i64("gfcicount"))
    }

    /// Returns all three trip counters, or `None` unless every one is known.
    #[must_use]
    pub fn checks_count(&self) -> Option<SafetyCounts> {
        self.read_status(|s| {
            Some(SafetyCounts {
                gfci: s.get_i64("gfcicount")?,
                no_ground: s.get_i64("nogndcount")?,
                stuck_relay: s.get_i64("stuckcount")?,
            })
        })
    }

    /// Returns the elapsed charge time in seconds.
    #[must_use]
    pub fn charge_time_elapsed(&self) -> Option<i64> {
        self.read_status(|s| s.get_i64("elapsed"))
    }

    /// Returns whether a vehicle is plugged in.
    #[must_use]
    pub fn vehicle(&self) -> Option<bool> {
        self.read_status(|s| s.get_bool("vehicle"))
    }

    /// Returns whether a firmware update is in progress.
    #[must_use]
    pub fn ota_update(&self) -> Option<bool> {
        self.read_status(|s| s.get_bool("ota_update"))
    }

    /// Returns whether a manual override is active.
    #[must_use]
    pub fn manual_override(&self) -> Option<bool> {
        self.read_status(|s| s.get_bool("manual_override"))
    }

    /// Returns the active divert mode.
    #[must_use]
    pub fn divert_mode_status(&self) -> Option<ChargeMode> {
        self.read_status(|s| s.get_i64("divertmode").map(ChargeMode::from_divert_code))
    }

    /// Returns the current available for divert, in amps.
    #[must_use]
    pub fn available_current(&self) -> Option<f64> {
        self.read_status(|s| s.get_f64("available_current"))
    }

    /// Returns the smoothed divert current, in amps.
    #[must_use]
    pub fn smoothed_available_current(&self) -> Option<f64> {
        self.read_status(|s| s.get_f64("smoothed_available_current"))
    }

    /// Returns the divert charge rate in amps.
    #[must_use]
    pub fn charge_rate(&self) -> Option<f64> {
        self.read_status(|s| s.get_f64("charge_rate"))
    }

    // ========== Shaper ==========

    /// Returns whether the current shaper is enabled.
    #[must_use]
    pub fn shaper_active(&self) -> Option<bool> {
        self.read_status(|s| s.get_bool("shaper"))
    }

    /// Returns the live power reading of the shaper, in watts.
    #[must_use]
    pub fn shaper_live_power(&self) -> Option<i64> {
        self.read_status(|s| s.get_i64("shaper_live_pwr"))
    }

    /// Returns the current the shaper allows, in amps.
    ///
    /// The charger reports 255 when the shaper imposes no limit; the pilot
    /// current is returned in that case.
    #[must_use]
    pub fn shaper_available_current(&self) -> Option<f64> {
        self.read_status(|s| {
            if s.get_i64("shaper_cur") == Some(SHAPER_UNLIMITED) {
                s.get_f64("pilot")
            } else {
                s.get_f64("shaper_cur")
            }
        })
    }

    /// Returns the shaper power limit in watts.
    #[must_use]
    pub fn shaper_max_power(&self) -> Option<i64> {
        self.read_status(|s| s.get_i64("shaper_max_pwr"))
    }

    /// Returns whether the shaper received a fresh reading.
    #[must_use]
    pub fn shaper_updated(&self) -> bool {
        self.read_status(|s| s.is_truthy("shaper_updated"))
    }

    // ========== Vehicle ==========

    /// Returns the vehicle battery level in percent.
    #[must_use]
    pub fn vehicle_soc(&self) -> Option<i64> {
        self.read_status(|s| {
            s.get_i64("vehicle_soc")
                .or_else(|| s.get_i64("battery_level"))
        })
    }

    /// Returns the vehicle range.
    #[must_use]
    pub fn vehicle_range(&self) -> Option<i64> {
        self.read_status(|s| {
            s.get_i64("vehicle_range")
                .or_else(|| s.get_i64("battery_range"))
        })
    }

    /// Returns the seconds until the vehicle is fully charged.
    #[must_use]
    pub fn vehicle_eta(&self) -> Option<i64> {
        self.read_status(|s| {
            s.get_i64("vehicle_eta")
                .or_else(|| s.get_i64("time_to_full_charge"))
        })
    }

    // ========== Services ==========

    /// Returns whether the gateway is connected to its MQTT broker.
    #[must_use]
    pub fn mqtt_connected(&self) -> bool {
        self.read_status(|s| s.is_truthy("mqtt_connected"))
    }

    /// Returns whether the gateway is posting to EmonCMS.
    #[must_use]
    pub fn emoncms_connected(&self) -> Option<bool> {
        self.read_status(|s| s.get_bool("emoncms_connected"))
    }

    /// Returns whether the gateway is connected to an OCPP backend.
    #[must_use]
    pub fn ocpp_connected(&self) -> Option<bool> {
        self.read_status(|s| s.get_bool("ocpp_connected"))
    }

    /// Returns the gateway uptime in seconds.
    #[must_use]
    pub fn uptime(&self) -> Option<i64> {
        self.read_status(|s| s.get_i64("uptime"))
    }

    /// Returns the gateway free heap in bytes.
    #[must_use]
    pub fn freeram(&self) -> Option<i64> {
        self.read_status(|s| s.get_i64("freeram"))
    }

    // ========== Energy totals ==========

    /// Returns the energy used today, in kWh.
    #[must_use]
    pub fn total_day(&self) -> Option<f64> {
        self.read_status(|s| s.get_f64("total_day"))
    }

    /// Returns the energy used this week, in kWh.
    #[must_use]
    pub fn total_week(&self) -> Option<f64> {
        self.read_status(|s| s.get_f64("total_week"))
    }

    /// Returns the energy used this month, in kWh.
    #[must_use]
    pub fn total_month(&self) -> Option<f64> {
        self.read_status(|s| s.get_f64("total_month"))
    }

    /// Returns the energy used this year, in kWh.
    #[must_use]
    pub fn total_year(&self) -> Option<f64> {
        self.read_status(|s| s.get_f64("total_year"))
    }

    /// Returns whether a session limit is set.
    #[must_use]
    pub fn has_limit(&self) -> Option<bool> {
        self.read_status(|s| s.get_bool("has_limit").or_else(|| s.get_bool("limit")))
    }

    /// Returns the maximum current currently in effect, in amps.
    #[must_use]
    pub fn max_current(&self) -> Option<i64> {
        self.read_status(|s| s.get_i64("max_current"))
    }

    /// Returns the charger's real time clock.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.read_status(|s| {
            DateTime::parse_from_rfc3339(s.get_str("time")?)
                .ok()
                .map(|time| time.with_timezone(&Utc))
        })
    }

    // ========== Config ==========

    /// Returns the gateway hostname.
    #[must_use]
    pub fn hostname(&self) -> Option<String> {
        self.read_config(|c| owned_str(c, "hostname"))
    }

    /// Returns the SSID the gateway is connected to.
    #[must_use]
    pub fn wifi_ssid(&self) -> Option<String> {
        self.read_config(|c| owned_str(c, "ssid"))
    }

    /// Returns the ammeter offset.
    #[must_use]
    pub fn ammeter_offset(&self) -> Option<i64> {
        self.read_config(|c| c.get_i64("offset"))
    }

    /// Returns the ammeter scale factor.
    #[must_use]
    pub fn ammeter_scale_factor(&self) -> Option<i64> {
        self.read_config(|c| c.get_i64("scale"))
    }

    /// Returns whether the temperature check is on.
    #[must_use]
    pub fn temp_check_enabled(&self) -> bool {
        self.read_config(|c| c.is_truthy("tempt"))
    }

    /// Returns whether the diode check is on.
    #[must_use]
    pub fn diode_check_enabled(&self) -> bool {
        self.read_config(|c| c.is_truthy("diodet"))
    }

    /// Returns whether vent-required charging is allowed.
    #[must_use]
    pub fn vent_required_enabled(&self) -> bool {
        self.read_config(|c| c.is_truthy("ventt"))
    }

    /// Returns whether the ground check is on.
    #[must_use]
    pub fn ground_check_enabled(&self) -> bool {
        self.read_config(|c| c.is_truthy("groundt"))
    }

    /// Returns whether the stuck relay check is on.
    #[must_use]
    pub fn stuck_relay_check_enabled(&self) -> bool {
        self.read_config(|c| c.is_truthy("relayt"))
    }

    /// Returns the configured J1772 service level.
    #[must_use]
    pub fn service_level(&self) -> Option<ServiceLevel> {
        self.read_config(|c| {
            let level = u8::try_from(c.get_i64("service")?).ok()?;
            ServiceLevel::new(level).ok()
        })
    }

    /// Returns the EVSE controller firmware.
    #[must_use]
    pub fn openevse_firmware(&self) -> Option<String> {
        self.read_config(|c| owned_str(c, "firmware"))
    }

    /// Returns the gateway firmware with any `dev` build suffix removed.
    #[must_use]
    pub fn wifi_firmware(&self) -> Option<String> {
        self.read_config(|c| {
            let version = c.get_str("version")?;
            if version.contains("dev") {
                Some(version.split('.').take(3).collect::<Vec<_>>().join("."))
            } else {
                Some(version.to_string())
            }
        })
    }

    /// Returns the parsed gateway firmware version used to gate commands.
    #[must_use]
    pub fn firmware_version(&self) -> Option<FirmwareVersion> {
        self.read_config(|c| c.get_str("version").and_then(FirmwareVersion::from_device))
    }

    /// Returns the RAPI protocol version. The charger reports `"-"` when unknown.
    #[must_use]
    pub fn protocol_version(&self) -> Option<String> {
        self.read_config(|c| owned_str(c, "protocol").filter(|protocol| protocol != "-"))
    }

    /// Returns the charge mode used at startup.
    #[must_use]
    pub fn charge_mode(&self) -> Option<ChargeMode> {
        self.read_config(|c| c.get_str("charge_mode")?.parse().ok())
    }

    /// Returns whether solar divert is enabled.
    #[must_use]
    pub fn divert_active(&self) -> bool {
        self.read_config(|c| c.is_truthy("divert_enabled"))
    }

    /// Returns the gateway serial number.
    #[must_use]
    pub fn wifi_serial(&self) -> Option<String> {
        self.read_config(|c| owned_str(c, "wifi_serial"))
    }

    /// Returns the hardware minimum charge current, 6 A if unknown.
    #[must_use]
    pub fn min_amps(&self) -> i64 {
        self.read_config(|c| c.get_i64("min_current_hard"))
            .unwrap_or(DEFAULT_MIN_AMPS)
    }

    /// Returns the hardware maximum charge current, 48 A if unknown.
    #[must_use]
    pub fn max_amps(&self) -> i64 {
        self.read_config(|c| c.get_i64("max_current_hard"))
            .unwrap_or(DEFAULT_MAX_AMPS)
    }

    /// Returns the LED brightness.
    #[must_use]
    pub fn led_brightness(&self) -> Option<i64> {
        self.read_config(|c| c.get_i64("led_brightness"))
    }

    /// Returns the configured soft current limit, or the pilot current on
    /// firmware that does not report one.
    #[must_use]
    pub fn max_current_soft(&self) -> Option<i64> {
        self.read_config(|c| c.get_i64("max_current_soft"))
            .or_else(|| self.current_capacity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::UpdateSource;
    use chrono::TimeZone;
    use serde_json::{Value, json};

    fn fields(value: Value) -> Vec<(String, Value)> {
        match value {
            Value::Object(map) => map.into_iter().collect(),
            _ => panic!("expected object"),
        }
    }

    fn with_fields(status: Value, config: Value) -> Charger {
        let charger = Charger::http("192.168.1.100").build().unwrap();
        let inner = &charger.inner;
        inner.status.apply(fields(status), UpdateSource::Poll);
        inner.config.apply(fields(config), UpdateSource::Poll);
        charger
    }

    #[test]
    fn empty_cache_reads_none() {
        let charger = with_fields(json!({}), json!({}));
        assert_eq!(charger.status(), Some("unknown".to_string()));
        assert!(charger.state().is_none());
        assert!(charger.charging_power().is_none());
        assert!(charger.checks_count().is_none());
        assert!(!charger.using_ethernet());
        assert_eq!(charger.min_amps(), 6);
        assert_eq!(charger.max_amps(), 48);
        assert!(charger.firmware_version().is_none());
    }

    #[test]
    fn status_falls_back_to_state_name() {
        let charger = with_fields(json!({"state": 254}), json!({}));
        assert_eq!(charger.status(), Some("sleeping".to_string()));
        assert_eq!(charger.state(), Some(EvseState::Sleeping));

        let charger = with_fields(json!({"state": 3, "status": "active"}), json!({}));
        assert_eq!(charger.status(), Some("active".to_string()));
    }

    #[test]
    fn derived_energy_and_power() {
        let charger = with_fields(
            json!({"voltage": 240, "amp": 15.333, "wattsec": 9000, "watthour": 1200}),
            json!({}),
        );
        assert_eq!(charger.charging_power(), Some(3679.92));
        assert_eq!(charger.usage_session(), Some(2.5));
        assert_eq!(charger.usage_total(), Some(1200.0));

        let charger = with_fields(
            json!({"session_energy": 7.5, "total_energy": 99.0, "watthour": 1}),
            json!({}),
        );
        assert_eq!(charger.usage_session(), Some(7.5));
        assert_eq!(charger.usage_total(), Some(99.0));
    }

    #[test]
    fn temperatures_in_tenths() {
        let charger = with_fields(
            json!({"temp": 0, "temp1": 215, "temp2": 0, "temp3": 312, "temp4": 450}),
            json!({}),
        );
        assert_eq!(charger.ambient_temperature(), Some(21.5));
        assert!(charger.rtc_temperature().is_none());
        assert_eq!(charger.ir_temperature(), Some(31.2));
        assert_eq!(charger.esp_temperature(), Some(45.0));
    }

    #[test]
    fn shaper_unlimited_follows_pilot() {
        let charger = with_fields(json!({"shaper_cur": 255, "pilot": 32}), json!({}));
        assert_eq!(charger.shaper_available_current(), Some(32.0));

        let charger = with_fields(json!({"shaper_cur": 21, "pilot": 32}), json!({}));
        assert_eq!(charger.shaper_available_current(), Some(21.0));
    }

    #[test]
    fn vehicle_fallbacks() {
        let charger = with_fields(
            json!({"battery_level": 80, "vehicle_range": 300, "time_to_full_charge": 1800}),
            json!({}),
        );
        assert_eq!(charger.vehicle_soc(), Some(80));
        assert_eq!(charger.vehicle_range(), Some(300));
        assert_eq!(charger.vehicle_eta(), Some(1800));
    }

    #[test]
    fn safety_counts_need_all_three() {
        let charger = with_fields(json!({"gfcicount": 1, "nogndcount": 0}), json!({}));
        assert!(charger.checks_count().is_none());

        let charger = with_fields(
            json!({"gfcicount": 1, "nogndcount": 0, "stuckcount": 2}),
            json!({}),
        );
        assert_eq!(
            charger.checks_count(),
            Some(SafetyCounts {
                gfci: 1,
                no_ground: 0,
                stuck_relay: 2
            })
        );
    }

    #[test]
    fn rtc_time_parses() {
        let charger = with_fields(json!({"time": "2021-08-10T23:00:11Z"}), json!({}));
        assert_eq!(
            charger.time(),
            Some(Utc.with_ymd_and_hms(2021, 8, 10, 23, 0, 11).unwrap())
        );
    }

    #[test]
    fn config_fields() {
        let charger = with_fields(
            json!({"pilot": 24}),
            json!({
                "version": "4.1.2.dev",
                "protocol": "-",
                "charge_mode": "eco",
                "service": 2,
                "divert_enabled": false,
                "relayt": true,
                "min_current_hard": 8,
            }),
        );
        assert_eq!(charger.wifi_firmware(), Some("4.1.2".to_string()));
        assert_eq!(
            charger.firmware_version(),
            Some(FirmwareVersion::new(4, 1, 2))
        );
        assert!(charger.protocol_version().is_none());
        assert_eq!(charger.charge_mode(), Some(ChargeMode::Eco));
        assert_eq!(charger.service_level(), Some(ServiceLevel::LEVEL_2));
        assert!(!charger.divert_active());
        assert!(charger.stuck_relay_check_enabled());
        assert_eq!(charger.min_amps(), 8);
        assert_eq!(charger.max_current_soft(), Some(24));
    }
}
