//! Typed message payloads.

use std::net::Ipv4Addr;

use crate::errors::Error;
use crate::frame::{self, Frame};
use crate::lv;
use crate::types::{Brightness, MessageKind, StateKind, Temperature};

type Result<T> = std::result::Result<T, Error>;

/// Decodes the payload of one known message kind.
pub(crate) type DecodeFn = fn(&[u8]) -> Result<Message>;

/// Device announcement sent to the broadcast address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    pub model: String,
    pub version: String,
    pub ip: Ipv4Addr,
    pub mac: Vec<u8>,
    /// Trailing field whose meaning is not known; kept verbatim.
    pub extra: Vec<u8>,
}

impl Broadcast {
    /// The MAC address formatted as colon-separated hex.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::net::Ipv4Addr;
    /// use neewer_rs::Broadcast;
    ///
    /// let bc = Broadcast {
    ///     model: "NL-660".into(),
    ///     version: "1.0".into(),
    ///     ip: Ipv4Addr::new(192, 168, 1, 40),
    ///     mac: vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x01],
    ///     extra: vec![],
    /// };
    /// assert_eq!(bc.mac_address(), "de:ad:be:ef:00:01");
    /// ```
    pub fn mac_address(&self) -> String {
        self.mac
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(":")
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        let ip = self.ip.to_string();
        lv::encode(&[
            self.version.as_bytes(),
            self.model.as_bytes(),
            ip.as_bytes(),
            self.mac.as_slice(),
            self.extra.as_slice(),
        ])
    }

    fn decode_payload(data: &[u8]) -> Result<Self> {
        let parts = lv::decode(data)?;
        let [version, model, ip, mac, extra] = parts.as_slice() else {
            return Err(Error::InvalidPartCount(parts.len()));
        };

        let ip_text = String::from_utf8_lossy(ip);
        let ip = ip_text
            .parse::<Ipv4Addr>()
            .map_err(|_| Error::InvalidIp(ip_text.to_string()))?;

        Ok(Broadcast {
            model: String::from_utf8_lossy(model).into_owned(),
            version: String::from_utf8_lossy(version).into_owned(),
            ip,
            mac: mac.to_vec(),
            extra: extra.to_vec(),
        })
    }
}

/// Power sub-payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Power {
    pub on: bool,
}

impl Power {
    const LEN: usize = 1;

    fn encode_payload(&self) -> Vec<u8> {
        vec![u8::from(self.on)]
    }

    fn decode_payload(data: &[u8]) -> Result<Self> {
        if data.len() != Self::LEN {
            return Err(Error::invalid_length(Self::LEN, data.len()));
        }
        Ok(Power {
            on: data[0] == 0x01,
        })
    }
}

/// Light sub-payload: brightness 0-100 and temperature 29-70.
///
/// Fields are public so a value read off the wire can be inspected as-is;
/// [`Light::new`] and encoding both enforce the ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Light {
    pub brightness: u8,
    pub temperature: u8,
}

impl Light {
    /// Brightness, temperature, reserved zero.
    const LEN: usize = 3;

    /// Create a validated light setting.
    ///
    /// # Examples
    ///
    /// ```
    /// use neewer_rs::Light;
    ///
    /// assert!(Light::new(0, 29).is_ok());
    /// assert!(Light::new(101, 40).is_err());
    /// assert!(Light::new(50, 28).is_err());
    /// ```
    pub fn new(brightness: u8, temperature: u8) -> Result<Self> {
        let light = Light {
            brightness,
            temperature,
        };
        light.validate()?;
        Ok(light)
    }

    pub fn brightness(&self) -> Option<Brightness> {
        Brightness::create(self.brightness)
    }

    pub fn temperature(&self) -> Option<Temperature> {
        Temperature::create(self.temperature)
    }

    pub fn validate(&self) -> Result<()> {
        if !Brightness::is_valid(self.brightness) {
            return Err(Error::InvalidBrightness(self.brightness));
        }
        if !Temperature::is_valid(self.temperature) {
            return Err(Error::InvalidTemperature(self.temperature));
        }
        Ok(())
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        self.validate()?;
        Ok(vec![self.brightness, self.temperature, 0x00])
    }

    fn decode_payload(data: &[u8]) -> Result<Self> {
        if data.len() != Self::LEN {
            return Err(Error::invalid_length(Self::LEN, data.len()));
        }
        Light::new(data[0], data[1])
    }
}

/// The state carried by a set or report message: exactly one of power or light.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateValue {
    Power(Power),
    Light(Light),
}

impl StateValue {
    /// Build from optional fields, failing unless exactly one is present.
    ///
    /// # Examples
    ///
    /// ```
    /// use neewer_rs::{Light, Power, StateValue};
    ///
    /// let power = Some(Power { on: true });
    /// let light = Some(Light::new(50, 40).unwrap());
    /// assert!(StateValue::from_parts(power, None).is_ok());
    /// assert!(StateValue::from_parts(power, light).is_err());
    /// assert!(StateValue::from_parts(None, None).is_err());
    /// ```
    pub fn from_parts(power: Option<Power>, light: Option<Light>) -> Result<Self> {
        match (power, light) {
            (Some(p), None) => Ok(StateValue::Power(p)),
            (None, Some(l)) => Ok(StateValue::Light(l)),
            (Some(_), Some(_)) => Err(Error::BothStates),
            (None, None) => Err(Error::NoState),
        }
    }

    pub fn kind(&self) -> StateKind {
        match self {
            StateValue::Power(_) => StateKind::Power,
            StateValue::Light(_) => StateKind::Light,
        }
    }

    pub fn power(&self) -> Option<&Power> {
        match self {
            StateValue::Power(p) => Some(p),
            StateValue::Light(_) => None,
        }
    }

    pub fn light(&self) -> Option<&Light> {
        match self {
            StateValue::Light(l) => Some(l),
            StateValue::Power(_) => None,
        }
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        let mut buf = vec![self.kind().id()];
        match self {
            StateValue::Power(p) => buf.extend(p.encode_payload()),
            StateValue::Light(l) => buf.extend(l.encode_payload()?),
        }
        Ok(buf)
    }

    fn decode_payload(data: &[u8]) -> Result<Self> {
        let (&kind, rest) = data.split_first().ok_or(Error::TooShort)?;
        match StateKind::try_from(kind)? {
            StateKind::Power => Power::decode_payload(rest).map(StateValue::Power),
            StateKind::Light => Light::decode_payload(rest).map(StateValue::Light),
        }
    }
}

/// A protocol message.
///
/// Every known id has its own variant; anything else decodes to
/// [`Message::Generic`] with the payload preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Broadcast(Broadcast),
    ConnectRequest { client_ip: Ipv4Addr },
    HostHeartbeat,
    ClientHeartbeat,
    SetState(StateValue),
    QueryState(StateKind),
    StateReport(StateValue),
    Generic { id: u8, payload: Vec<u8> },
}

impl Message {
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Message::Broadcast(_) => Some(MessageKind::Broadcast),
            Message::ConnectRequest { .. } => Some(MessageKind::ConnectRequest),
            Message::HostHeartbeat => Some(MessageKind::HostHeartbeat),
            Message::ClientHeartbeat => Some(MessageKind::ClientHeartbeat),
            Message::SetState(_) => Some(MessageKind::SetState),
            Message::QueryState(_) => Some(MessageKind::QueryState),
            Message::StateReport(_) => Some(MessageKind::StateReport),
            Message::Generic { .. } => None,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            Message::Generic { id, .. } => *id,
            other => other.kind().map_or(0, |k| k.id()),
        }
    }

    /// Short name for logs and history.
    pub fn name(&self) -> &'static str {
        self.kind().map_or("Generic", |k| k.into())
    }

    pub fn encode_payload(&self) -> Result<Vec<u8>> {
        match self {
            Message::Broadcast(bc) => bc.encode_payload(),
            Message::ConnectRequest { client_ip } => {
                let ip = client_ip.to_string();
                let mut buf = vec![0x00];
                buf.extend(lv::encode(&[ip.as_bytes()])?);
                Ok(buf)
            }
            Message::HostHeartbeat | Message::ClientHeartbeat => Ok(Vec::new()),
            Message::SetState(state) | Message::StateReport(state) => state.encode_payload(),
            Message::QueryState(kind) => Ok(vec![kind.id()]),
            Message::Generic { payload, .. } => Ok(payload.clone()),
        }
    }

    pub fn to_frame(&self) -> Result<Frame> {
        Ok(Frame::new(self.id(), self.encode_payload()?))
    }

    /// Encode as complete frame bytes ready for the socket.
    ///
    /// # Examples
    ///
    /// ```
    /// use neewer_rs::{Message, StateKind};
    ///
    /// let bytes = Message::QueryState(StateKind::Light).encode().unwrap();
    /// assert_eq!(bytes, vec![0x80, 0x06, 0x01, 0x02, 0x89]);
    /// ```
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = self.encode_payload()?;
        frame::encode(self.id(), &payload)
    }

    pub(crate) fn decoder(kind: MessageKind) -> DecodeFn {
        match kind {
            MessageKind::Broadcast => decode_broadcast,
            MessageKind::ConnectRequest => decode_connect_request,
            MessageKind::HostHeartbeat => decode_host_heartbeat,
            MessageKind::ClientHeartbeat => decode_client_heartbeat,
            MessageKind::SetState => decode_set_state,
            MessageKind::QueryState => decode_query_state,
            MessageKind::StateReport => decode_state_report,
        }
    }
}

fn decode_broadcast(data: &[u8]) -> Result<Message> {
    Broadcast::decode_payload(data).map(Message::Broadcast)
}

/// The light never sends this, so decoding is lenient: the address is read
/// when it is well formed and left unspecified otherwise.
fn decode_connect_request(data: &[u8]) -> Result<Message> {
    let client_ip = data
        .get(1..)
        .and_then(|rest| lv::decode(rest).ok())
        .and_then(|parts| parts.first().map(|p| String::from_utf8_lossy(p).into_owned()))
        .and_then(|text| text.parse().ok())
        .unwrap_or(Ipv4Addr::UNSPECIFIED);
    Ok(Message::ConnectRequest { client_ip })
}

fn decode_host_heartbeat(_: &[u8]) -> Result<Message> {
    Ok(Message::HostHeartbeat)
}

fn decode_client_heartbeat(_: &[u8]) -> Result<Message> {
    Ok(Message::ClientHeartbeat)
}

fn decode_set_state(data: &[u8]) -> Result<Message> {
    StateValue::decode_payload(data).map(Message::SetState)
}

fn decode_query_state(data: &[u8]) -> Result<Message> {
    match data {
        [kind] => StateKind::try_from(*kind).map(Message::QueryState),
        _ => Err(Error::invalid_length(1, data.len())),
    }
}

fn decode_state_report(data: &[u8]) -> Result<Message> {
    StateValue::decode_payload(data).map(Message::StateReport)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(msg: &Message) -> Result<Message> {
        let payload = msg.encode_payload()?;
        Message::decoder(msg.kind().unwrap())(&payload)
    }

    fn sample_broadcast() -> Broadcast {
        Broadcast {
            model: "NL-660".into(),
            version: "2.1".into(),
            ip: Ipv4Addr::new(192, 168, 1, 40),
            mac: vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x01],
            extra: vec![0x07],
        }
    }

    #[test]
    fn test_known_variants_round_trip() {
        let messages = [
            Message::Broadcast(sample_broadcast()),
            Message::ConnectRequest {
                client_ip: Ipv4Addr::new(192, 168, 1, 10),
            },
            Message::HostHeartbeat,
            Message::ClientHeartbeat,
            Message::SetState(StateValue::Power(Power { on: true })),
            Message::SetState(StateValue::Light(Light::new(75, 56).unwrap())),
            Message::QueryState(StateKind::Power),
            Message::StateReport(StateValue::Power(Power { on: false })),
            Message::StateReport(StateValue::Light(Light::new(100, 70).unwrap())),
        ];
        for msg in &messages {
            assert_eq!(&decode(msg).unwrap(), msg);
        }
    }

    #[test]
    fn test_broadcast_wire_order() {
        let payload = Message::Broadcast(sample_broadcast()).encode_payload().unwrap();
        // Version comes first on the wire, then model.
        assert_eq!(&payload[..5], &[0x00, 0x03, b'2', b'.', b'1']);
    }

    #[test]
    fn test_broadcast_rejects_wrong_part_count() {
        let parts: [&[u8]; 3] = [b"1.0", b"NL", b"10.0.0.1"];
        let payload = lv::encode(&parts).unwrap();
        assert_eq!(
            Message::decoder(MessageKind::Broadcast)(&payload),
            Err(Error::InvalidPartCount(3))
        );
    }

    #[test]
    fn test_broadcast_rejects_bad_ip() {
        let parts: [&[u8]; 5] = [b"1.0", b"NL", b"not-an-ip", b"", b""];
        let payload = lv::encode(&parts).unwrap();
        assert_eq!(
            Message::decoder(MessageKind::Broadcast)(&payload),
            Err(Error::InvalidIp("not-an-ip".into()))
        );
    }

    #[test]
    fn test_connect_request_layout() {
        let msg = Message::ConnectRequest {
            client_ip: Ipv4Addr::new(10, 0, 0, 2),
        };
        let payload = msg.encode_payload().unwrap();
        assert_eq!(&payload[..3], &[0x00, 0x00, 0x08]);
        assert_eq!(&payload[3..], b"10.0.0.2");
    }

    #[test]
    fn test_connect_request_decode_is_lenient() {
        let decoded = Message::decoder(MessageKind::ConnectRequest)(&[0xff]).unwrap();
        assert_eq!(
            decoded,
            Message::ConnectRequest {
                client_ip: Ipv4Addr::UNSPECIFIED
            }
        );
    }

    #[test]
    fn test_light_wire_bytes() {
        let state = StateValue::Light(Light {
            brightness: 0,
            temperature: 29,
        });
        assert_eq!(state.encode_payload().unwrap(), vec![0x02, 0x00, 0x1d, 0x00]);
    }

    #[test]
    fn test_light_encode_validates_range() {
        let too_bright = StateValue::Light(Light {
            brightness: 101,
            temperature: 40,
        });
        assert_eq!(too_bright.encode_payload(), Err(Error::InvalidBrightness(101)));

        let too_warm = StateValue::Light(Light {
            brightness: 50,
            temperature: 28,
        });
        assert_eq!(too_warm.encode_payload(), Err(Error::InvalidTemperature(28)));
    }

    #[test]
    fn test_state_from_parts() {
        let power = Some(Power { on: true });
        let light = Some(Light::new(10, 30).unwrap());
        assert_eq!(StateValue::from_parts(power, light), Err(Error::BothStates));
        assert_eq!(StateValue::from_parts(None, None), Err(Error::NoState));
        assert_eq!(
            StateValue::from_parts(None, light).unwrap().kind(),
            StateKind::Light
        );
    }

    #[test]
    fn test_state_decode_errors() {
        let decode = Message::decoder(MessageKind::StateReport);
        assert_eq!(decode(&[]), Err(Error::TooShort));
        assert_eq!(decode(&[0x09, 0x01]), Err(Error::UnknownStateKind(0x09)));
        assert_eq!(decode(&[0x01, 0x01, 0x00]), Err(Error::invalid_length(1, 2)));
        assert_eq!(decode(&[0x02, 0x32, 0x28]), Err(Error::invalid_length(3, 2)));
        assert_eq!(decode(&[0x02, 0x65, 0x28, 0x00]), Err(Error::InvalidBrightness(101)));
    }

    #[test]
    fn test_query_state_length() {
        let decode = Message::decoder(MessageKind::QueryState);
        assert_eq!(decode(&[0x02]), Ok(Message::QueryState(StateKind::Light)));
        assert_eq!(decode(&[0x02, 0x00]), Err(Error::invalid_length(1, 2)));
        assert_eq!(decode(&[]), Err(Error::invalid_length(1, 0)));
    }

    #[test]
    fn test_generic_preserves_payload() {
        let msg = Message::Generic {
            id: 0x42,
            payload: vec![1, 2, 3],
        };
        assert_eq!(msg.id(), 0x42);
        assert_eq!(msg.name(), "Generic");
        assert_eq!(msg.encode().unwrap(), vec![0x80, 0x42, 0x03, 1, 2, 3, 0xcb]);
    }
}
