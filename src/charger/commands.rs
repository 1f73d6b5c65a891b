// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Device commands.
//!
//! Thin wrappers over [`Charger::send`] that pick the right endpoint for the
//! charger's firmware. Operations added to the REST API late fall back to
//! RAPI on older gateways.

use serde_json::{Map, Value};

use crate::charger::Charger;
use crate::command::{
    ClaimCommand, ClaimRequest, Command, ConfigCommand, DivertModeCommand, LimitCommand,
    OverrideCommand, OverrideRequest, RapiCommand, RestartCommand, ScheduleCommand, SensorCommand,
};
use crate::error::{Error, ValueError};
use crate::response::RapiReply;
use crate::types::{ChargeMode, EvseState, FirmwareVersion, LimitType, ServiceLevel};

/// First gateway that exposes the override endpoint.
const OVERRIDE_FIRMWARE: FirmwareVersion = FirmwareVersion::new(4, 0, 1);

/// First gateway that sets the charge current through an override.
const OVERRIDE_CURRENT_FIRMWARE: FirmwareVersion = FirmwareVersion::new(4, 1, 2);

/// First gateway that restarts the EVSE over HTTP.
const RESTART_EVSE_FIRMWARE: FirmwareVersion = FirmwareVersion::new(5, 0, 0);

/// First gateway with the divert toggle.
const DIVERT_FIRMWARE: FirmwareVersion = FirmwareVersion::new(2, 9, 1);

/// First gateway with EVSE manager claims.
const CLAIMS_FIRMWARE: FirmwareVersion = FirmwareVersion::new(4, 1, 0);

/// Returns the reply as an object, or an empty one for any other reply.
fn into_object(reply: Value) -> Map<String, Value> {
    match reply {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl Charger {
    // ========== Configuration ==========

    /// Sets the charge mode used at startup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandRejected`] if the charger did not apply it.
    pub async fn set_charge_mode(&self, mode: ChargeMode) -> Result<(), Error> {
        tracing::debug!(%mode, "Setting charge mode");
        self.send(&ConfigCommand::ChargeMode(mode)).await?;
        Ok(())
    }

    /// Sets the J1772 service level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandRejected`] if the charger did not apply it.
    pub async fn set_service_level(&self, level: ServiceLevel) -> Result<(), Error> {
        tracing::debug!(level = level.value(), "Setting service level");
        self.send(&ConfigCommand::ServiceLevel(level)).await?;
        Ok(())
    }

    /// Sets the status LED brightness. Needs gateway 4.1.0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on older firmware.
    pub async fn set_led_brightness(&self, level: u8) -> Result<(), Error> {
        tracing::debug!(level, "Setting LED brightness");
        self.send(&ConfigCommand::LedBrightness(level)).await?;
        Ok(())
    }

    /// Flips the solar divert setting and returns the charger's reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on firmware older than 2.9.1 or
    /// when the configuration carries no `divert_enabled`.
    pub async fn toggle_divert(&self) -> Result<Value, Error> {
        if !self.supports(DIVERT_FIRMWARE).await? {
            return Err(Error::UnsupportedFeature);
        }
        let Some(enabled) = self.inner.config.read(|c| c.get_bool("divert_enabled")) else {
            tracing::debug!("Unable to check divert status");
            return Err(Error::UnsupportedFeature);
        };

        tracing::debug!(enabled = !enabled, "Toggling divert");
        self.send(&ConfigCommand::DivertEnabled(!enabled)).await
    }

    /// Sets the solar divert mode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandRejected`] unless the charger confirms the change.
    pub async fn set_divert_mode(&self, mode: ChargeMode) -> Result<(), Error> {
        tracing::debug!(%mode, "Setting divert mode");
        let reply = self.send(&DivertModeCommand(mode)).await?;
        match reply {
            Value::String(text) if text == DivertModeCommand::SUCCESS_REPLY => Ok(()),
            other => {
                tracing::error!(reply = %other, "Problem issuing divert mode command");
                Err(Error::CommandRejected(match other {
                    Value::String(text) => text,
                    other => other.to_string(),
                }))
            }
        }
    }

    // ========== Manual override ==========

    /// Reads the manual override. Needs gateway 4.0.1.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on older firmware.
    pub async fn get_override(&self) -> Result<Value, Error> {
        self.send(&OverrideCommand::Get).await
    }

    /// Updates the manual override.
    ///
    /// The current override is read first and `request` is applied on top of
    /// it, so properties it leaves unset are kept.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on firmware older than 4.0.1.
    pub async fn set_override(&self, request: OverrideRequest) -> Result<Value, Error> {
        let current = into_object(self.get_override().await?);
        let properties = request.merge_into(current);
        tracing::debug!(?properties, "Setting override");
        self.send(&OverrideCommand::Set(properties)).await
    }

    /// Toggles the manual override.
    ///
    /// Firmware older than 4.0.1 has no override endpoint; the EVSE is woken
    /// up with RAPI `$FE` when sleeping and put to sleep with `$FS` otherwise.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`send`](Self::send).
    pub async fn toggle_override(&self) -> Result<(), Error> {
        if self.supports(OVERRIDE_FIRMWARE).await? {
            let reply = self.send(&OverrideCommand::Toggle).await?;
            tracing::debug!(%reply, "Toggle response");
        } else {
            let command = if self.state() == Some(EvseState::Sleeping) {
                RapiCommand::enable()
            } else {
                RapiCommand::sleep()
            };
            tracing::debug!(
                command = command.as_str(),
                "Toggling manual override via RAPI"
            );
            let reply = self.send_rapi(command).await?;
            tracing::debug!(ret = reply.ret(), "Toggle response");
        }
        Ok(())
    }

    /// Removes the manual override.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on firmware older than 4.0.1.
    pub async fn clear_override(&self) -> Result<Value, Error> {
        self.send(&OverrideCommand::Clear).await
    }

    /// Returns the state of the manual override.
    ///
    /// `"auto"` when no override is active, `None` on firmware without the
    /// override endpoint.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`get_override`](Self::get_override) other than
    /// [`Error::UnsupportedFeature`].
    pub async fn override_state(&self) -> Result<Option<String>, Error> {
        match self.get_override().await {
            Ok(reply) => Ok(Some(
                reply
                    .get("state")
                    .and_then(Value::as_str)
                    .unwrap_or("auto")
                    .to_string(),
            )),
            Err(Error::UnsupportedFeature) => {
                tracing::debug!("Override state unavailable on older firmware");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Sets the soft current limit in amps.
    ///
    /// Gateway 4.1.2 and later use a manual override, validated against the
    /// hardware limits; older firmware uses RAPI `$SC`.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::OutOfRange`] if `amps` is outside
    /// [`min_amps`](Self::min_amps)..=[`max_amps`](Self::max_amps).
    pub async fn set_current(&self, amps: u32) -> Result<(), Error> {
        if self.supports(OVERRIDE_CURRENT_FIRMWARE).await? {
            let (min, max) = (self.min_amps(), self.max_amps());
            let actual = i64::from(amps);
            if actual < min || actual > max {
                tracing::error!(amps, min, max, "Invalid value for current limit");
                return Err(ValueError::OutOfRange { min, max, actual }.into());
            }

            tracing::debug!(amps, "Setting current limit");
            let reply = self
                .set_override(OverrideRequest::new().with_charge_current(amps))
                .await?;
            tracing::debug!(%reply, "Set current response");
        } else {
            tracing::debug!(amps, "Setting current via RAPI");
            let reply = self.send_rapi(RapiCommand::set_current(amps)).await?;
            tracing::debug!(ret = reply.ret(), "Set current response");
        }
        Ok(())
    }

    /// Returns the charge current in effect, in amps.
    ///
    /// Uses the EVSE manager target when claims are supported, capped at the
    /// hardware maximum, else [`max_current_soft`](Self::max_current_soft).
    ///
    /// # Errors
    ///
    /// Returns the errors of [`list_claims`](Self::list_claims) other than
    /// [`Error::UnsupportedFeature`].
    pub async fn charge_current(&self) -> Result<Option<i64>, Error> {
        let target = if self.supports(CLAIMS_FIRMWARE).await? {
            Some(self.list_claims(true).await?)
        } else {
            None
        };

        let claimed = target
            .as_ref()
            .and_then(|t| t.pointer("/properties/charge_current"))
            .and_then(Value::as_i64);
        if let Some(current) = claimed {
            return Ok(Some(current.min(self.max_amps())));
        }
        Ok(self.max_current_soft())
    }

    // ========== Restart ==========

    /// Restarts the WiFi gateway.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`send`](Self::send).
    pub async fn restart_wifi(&self) -> Result<Value, Error> {
        let reply = self.send(&RestartCommand::Gateway).await?;
        tracing::debug!(%reply, "WiFi restart response");
        Ok(reply)
    }

    /// Restarts the EVSE controller, over HTTP on gateway 5.0.0 and later
    /// and with RAPI `$FR` before.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`send`](Self::send).
    pub async fn restart_evse(&self) -> Result<(), Error> {
        if self.supports(RESTART_EVSE_FIRMWARE).await? {
            tracing::debug!("Restarting EVSE module via HTTP");
            let reply = self.send(&RestartCommand::Evse).await?;
            tracing::debug!(%reply, "EVSE restart response");
        } else {
            tracing::debug!("Restarting EVSE module via RAPI");
            let reply = self.send_rapi(RapiCommand::reset()).await?;
            tracing::debug!(ret = reply.ret(), "EVSE restart response");
        }
        Ok(())
    }

    // ========== Sensors ==========

    /// Pushes the grid voltage. Nothing is sent for `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on firmware older than 2.9.1.
    pub async fn grid_voltage(&self, voltage: Option<i64>) -> Result<(), Error> {
        self.post_sensor(SensorCommand::GridVoltage { voltage }).await
    }

    /// Pushes solar production or grid import/export for divert.
    ///
    /// With `invert`, `grid` is negated so that import is negative.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on firmware older than 2.9.1.
    pub async fn self_production(
        &self,
        grid: Option<i64>,
        solar: Option<i64>,
        invert: bool,
        voltage: Option<i64>,
    ) -> Result<(), Error> {
        self.post_sensor(SensorCommand::SelfProduction {
            grid,
            solar,
            invert,
            voltage,
        })
        .await
    }

    /// Pushes the vehicle state of charge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on firmware older than 4.1.0.
    pub async fn soc(
        &self,
        battery_level: Option<i64>,
        battery_range: Option<i64>,
        time_to_full: Option<i64>,
        voltage: Option<i64>,
    ) -> Result<(), Error> {
        self.post_sensor(SensorCommand::VehicleSoc {
            battery_level,
            battery_range,
            time_to_full,
            voltage,
        })
        .await
    }

    async fn post_sensor(&self, command: SensorCommand) -> Result<(), Error> {
        if let Some(minimum) = command.min_firmware() {
            self.require(minimum).await?;
        }
        if command.is_empty() {
            tracing::info!("No sensor data to send to device");
            return Ok(());
        }
        let reply = self.execute(&command).await?;
        tracing::debug!(%reply, "Sensor posting response");
        Ok(())
    }

    // ========== Limits ==========

    /// Reads the session limit. Needs gateway 5.0.0.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on older firmware.
    pub async fn get_limit(&self) -> Result<Value, Error> {
        self.send(&LimitCommand::Get).await
    }

    /// Sets a session limit of `value` (seconds, Wh, percent or range
    /// depending on `kind`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on firmware older than 5.0.0.
    pub async fn set_limit(
        &self,
        kind: LimitType,
        value: u64,
        release: Option<bool>,
    ) -> Result<Value, Error> {
        let current = into_object(self.get_limit().await?);
        self.send(&LimitCommand::set(current, kind, value, release))
            .await
    }

    /// Removes the session limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on firmware older than 5.0.0.
    pub async fn clear_limit(&self) -> Result<Value, Error> {
        self.send(&LimitCommand::Clear).await
    }

    // ========== Claims ==========

    /// Makes a claim as the default client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on firmware older than 4.1.0.
    pub async fn make_claim(&self, request: ClaimRequest) -> Result<Value, Error> {
        self.send(&ClaimCommand::make(request)).await
    }

    /// Releases the claim of the default client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on firmware older than 4.1.0.
    pub async fn release_claim(&self) -> Result<Value, Error> {
        self.send(&ClaimCommand::release()).await
    }

    /// Lists the claims, or only the resolved target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFeature`] on firmware older than 4.1.0.
    pub async fn list_claims(&self, target: bool) -> Result<Value, Error> {
        self.send(&ClaimCommand::List { target }).await
    }

    // ========== Misc ==========

    /// Returns the timer schedule.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`send`](Self::send).
    pub async fn get_schedule(&self) -> Result<Value, Error> {
        self.send(&ScheduleCommand).await
    }

    /// Sends a raw RAPI command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandRejected`] if the gateway refused to forward
    /// it, plus the errors of [`send`](Self::send).
    pub async fn send_rapi(&self, command: RapiCommand) -> Result<RapiReply, Error> {
        let reply = self.send(&command).await?;
        RapiReply::from_value(&reply)
    }
}
