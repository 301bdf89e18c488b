//! Motion sensor interface and an MPU-6050 register driver.

use core::fmt::{Debug, Display};

use nalgebra::Vector3;
use thiserror::Error;

use crate::conversion::{
    raw_accel_to_g, raw_gyro_to_dps, raw_temperature_to_celsius, register_pair_to_i16,
};

/// One instantaneous motion reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// Linear acceleration in g.
    pub accel: Vector3<f64>,
    /// Angular rate in deg/s.
    pub gyro: Vector3<f64>,
}

impl SensorSample {
    pub fn new(accel: Vector3<f64>, gyro: Vector3<f64>) -> Self {
        Self { accel, gyro }
    }

    /// 1 g straight down, no rotation.
    pub fn at_rest() -> Self {
        Self::new(Vector3::new(0.0, 0.0, 1.0), Vector3::zeros())
    }
}

pub trait MotionSensor {
    type Error: Debug + Display;

    fn read_acceleration(&mut self) -> Result<Vector3<f64>, Self::Error>;

    fn read_angular_rate(&mut self) -> Result<Vector3<f64>, Self::Error>;

    /// Die temperature in °C. Not used for tracking.
    fn read_temperature(&mut self) -> Result<f64, Self::Error>;

    fn read_sample(&mut self) -> Result<SensorSample, Self::Error> {
        let accel = self.read_acceleration()?;
        let gyro = self.read_angular_rate()?;
        Ok(SensorSample::new(accel, gyro))
    }
}

/// Byte-register access to a device on a shared bus (I2C or similar).
pub trait RegisterBus {
    type Error: Debug + Display;

    fn write_register(&mut self, address: u8, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Reads consecutive registers starting at `register` into `buffer`.
    fn read_registers(
        &mut self,
        address: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Self::Error>;
}

pub const MPU6050_DEFAULT_ADDRESS: u8 = 0x68;
pub const MPU6050_WHO_AM_I_VALUE: u8 = 0x68;

const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_WHO_AM_I: u8 = 0x75;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_TEMP_OUT_H: u8 = 0x41;
const REG_GYRO_XOUT_H: u8 = 0x43;

#[derive(Debug, Error)]
pub enum Mpu6050Error<E> {
    #[error("register bus error: {0}")]
    Bus(E),
}

/// MPU-6050 at its power-on ranges (±2 g, ±250 deg/s).
pub struct Mpu6050<B: RegisterBus> {
    bus: B,
    address: u8,
    who_am_i: u8,
}

impl<B: RegisterBus> Mpu6050<B> {
    /// Wakes the device from sleep and reads its identity register.
    pub fn new(mut bus: B, address: u8) -> Result<Self, Mpu6050Error<B::Error>> {
        bus.write_register(address, REG_PWR_MGMT_1, 0x00).map_err(Mpu6050Error::Bus)?;

        let mut who_am_i = [0u8; 1];
        bus.read_registers(address, REG_WHO_AM_I, &mut who_am_i).map_err(Mpu6050Error::Bus)?;
        let who_am_i = who_am_i[0];

        if who_am_i != MPU6050_WHO_AM_I_VALUE {
            // Compatible clones report other ids but share the register map.
            tracing::warn!("MPU-6050 at {:#04x} reports WHO_AM_I {:#04x}", address, who_am_i);
        } else {
            tracing::debug!("MPU-6050 at {:#04x} is awake", address);
        }

        Ok(Self { bus, address, who_am_i })
    }

    pub fn who_am_i(&self) -> u8 {
        self.who_am_i
    }

    pub fn release(self) -> B {
        self.bus
    }

    fn read_triplet(&mut self, register: u8) -> Result<[i16; 3], Mpu6050Error<B::Error>> {
        let mut buffer = [0u8; 6];
        self.bus
            .read_registers(self.address, register, &mut buffer)
            .map_err(Mpu6050Error::Bus)?;

        Ok([
            register_pair_to_i16(buffer[0], buffer[1]),
            register_pair_to_i16(buffer[2], buffer[3]),
            register_pair_to_i16(buffer[4], buffer[5]),
        ])
    }
}

impl<B: RegisterBus> MotionSensor for Mpu6050<B> {
    type Error = Mpu6050Error<B::Error>;

    fn read_acceleration(&mut self) -> Result<Vector3<f64>, Self::Error> {
        let [x, y, z] = self.read_triplet(REG_ACCEL_XOUT_H)?;
        Ok(Vector3::new(raw_accel_to_g(x), raw_accel_to_g(y), raw_accel_to_g(z)))
    }

    fn read_angular_rate(&mut self) -> Result<Vector3<f64>, Self::Error> {
        let [x, y, z] = self.read_triplet(REG_GYRO_XOUT_H)?;
        Ok(Vector3::new(raw_gyro_to_dps(x), raw_gyro_to_dps(y), raw_gyro_to_dps(z)))
    }

    fn read_temperature(&mut self) -> Result<f64, Self::Error> {
        let mut buffer = [0u8; 2];
        self.bus
            .read_registers(self.address, REG_TEMP_OUT_H, &mut buffer)
            .map_err(Mpu6050Error::Bus)?;
        Ok(raw_temperature_to_celsius(register_pair_to_i16(buffer[0], buffer[1])))
    }
}
