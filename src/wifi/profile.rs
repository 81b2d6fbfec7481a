use crate::error::ConnectError;
use crate::wifi::types::{NetworkCredential, NetworkId, NetworkIdentity, SecurityMode};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use secrecy::{ExposeSecret, SecretString};
use std::io::Cursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyManagement {
    None,
    WpaPsk,
}

impl KeyManagement {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyManagement::None => "none",
            KeyManagement::WpaPsk => "WPA-PSK",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAlgorithm {
    Open,
    Shared,
}

impl AuthAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthAlgorithm::Open => "OPEN",
            AuthAlgorithm::Shared => "SHARED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {
    Ccmp,
    Tkip,
    Wep40,
    Wep104,
}

impl Cipher {
    pub fn as_str(self) -> &'static str {
        match self {
            Cipher::Ccmp => "CCMP",
            Cipher::Tkip => "TKIP",
            Cipher::Wep40 => "WEP40",
            Cipher::Wep104 => "WEP104",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStatus {
    Enabled,
}

/// Which config field the credential lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSlot {
    None,
    /// WEP key at the given key index
    WepKey(u8),
    PreSharedKey,
}

/// Per-mode encoding rules for building a `NetworkConfig`
#[derive(Debug, PartialEq, Eq)]
pub struct Encoding {
    pub hidden: bool,
    pub secret: SecretSlot,
    pub key_management: KeyManagement,
    pub auth_algorithms: &'static [AuthAlgorithm],
    pub group_ciphers: &'static [Cipher],
    pub pairwise_ciphers: &'static [Cipher],
    pub status: Option<ConfigStatus>,
}

static OPEN_ENCODING: Encoding = Encoding {
    hidden: false,
    secret: SecretSlot::None,
    key_management: KeyManagement::None,
    auth_algorithms: &[],
    group_ciphers: &[],
    pairwise_ciphers: &[],
    status: None,
};

static WEP_ENCODING: Encoding = Encoding {
    hidden: true,
    secret: SecretSlot::WepKey(0),
    key_management: KeyManagement::None,
    auth_algorithms: &[AuthAlgorithm::Shared],
    group_ciphers: &[Cipher::Ccmp, Cipher::Tkip, Cipher::Wep40, Cipher::Wep104],
    pairwise_ciphers: &[],
    status: None,
};

static WPA_ENCODING: Encoding = Encoding {
    hidden: true,
    secret: SecretSlot::PreSharedKey,
    key_management: KeyManagement::WpaPsk,
    auth_algorithms: &[AuthAlgorithm::Open],
    group_ciphers: &[Cipher::Tkip, Cipher::Ccmp],
    pairwise_ciphers: &[Cipher::Tkip, Cipher::Ccmp],
    status: Some(ConfigStatus::Enabled),
};

impl SecurityMode {
    pub fn encoding(self) -> &'static Encoding {
        match self {
            SecurityMode::Open => &OPEN_ENCODING,
            SecurityMode::Wep => &WEP_ENCODING,
            SecurityMode::Wpa => &WPA_ENCODING,
        }
    }
}

/// Provider-facing descriptor for one connection attempt.
///
/// Built fresh per attempt and handed to the provider by reference; the
/// coordinator never keeps it.
#[derive(Debug)]
pub struct NetworkConfig {
    pub ssid: String,
    /// Id of the matching saved configuration, set when updating one
    pub network_id: Option<NetworkId>,
    pub hidden: bool,
    pub key_management: KeyManagement,
    pub wep_key: Option<SecretString>,
    pub wep_tx_key_index: Option<u8>,
    pub pre_shared_key: Option<SecretString>,
    pub auth_algorithms: Vec<AuthAlgorithm>,
    pub group_ciphers: Vec<Cipher>,
    pub pairwise_ciphers: Vec<Cipher>,
    pub status: Option<ConfigStatus>,
}

impl NetworkConfig {
    /// Build a config from the encoding table for the identity's mode
    pub fn build(
        identity: &NetworkIdentity,
        credential: Option<&NetworkCredential>,
    ) -> Result<Self, ConnectError> {
        let mode = identity.security();
        let encoding = mode.encoding();

        let secret = match (encoding.secret, credential) {
            (SecretSlot::None, _) => None,
            (_, Some(credential)) => Some(credential.to_secret()),
            (_, None) => {
                return Err(ConnectError::MissingCredential {
                    ssid: identity.ssid().to_string(),
                    mode,
                });
            }
        };

        let mut config = NetworkConfig {
            ssid: identity.ssid().to_string(),
            network_id: None,
            hidden: encoding.hidden,
            key_management: encoding.key_management,
            wep_key: None,
            wep_tx_key_index: None,
            pre_shared_key: None,
            auth_algorithms: encoding.auth_algorithms.to_vec(),
            group_ciphers: encoding.group_ciphers.to_vec(),
            pairwise_ciphers: encoding.pairwise_ciphers.to_vec(),
            status: encoding.status,
        };

        match encoding.secret {
            SecretSlot::None => {}
            SecretSlot::WepKey(index) => {
                config.wep_key = secret;
                config.wep_tx_key_index = Some(index);
            }
            SecretSlot::PreSharedKey => config.pre_shared_key = secret,
        }

        Ok(config)
    }

    /// Render this config as a profile XML document
    pub fn to_profile_xml(&self) -> String {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let _ = writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)));
        self.write_profile(&mut writer);
        String::from_utf8(writer.into_inner().into_inner()).unwrap_or_default()
    }

    pub(crate) fn write_profile<W: std::io::Write>(&self, writer: &mut Writer<W>) {
        let _ = writer.write_event(Event::Start(BytesStart::new("WifiProfile")));

        write_element(writer, "ssid", &self.ssid);
        if let Some(id) = self.network_id {
            write_element(writer, "networkId", &id.to_string());
        }
        write_element(writer, "hidden", if self.hidden { "true" } else { "false" });
        write_element(writer, "keyManagement", self.key_management.as_str());

        write_list(
            writer,
            "authAlgorithms",
            self.auth_algorithms.iter().map(|a| a.as_str()),
        );
        write_list(
            writer,
            "groupCiphers",
            self.group_ciphers.iter().map(|c| c.as_str()),
        );
        write_list(
            writer,
            "pairwiseCiphers",
            self.pairwise_ciphers.iter().map(|c| c.as_str()),
        );

        if let Some(key) = &self.wep_key {
            let index = self.wep_tx_key_index.unwrap_or(0).to_string();
            let mut start = BytesStart::new("wepKey");
            start.push_attribute(("index", index.as_str()));
            let _ = writer.write_event(Event::Start(start));
            let _ = writer.write_event(Event::Text(BytesText::new(key.expose_secret())));
            let _ = writer.write_event(Event::End(BytesEnd::new("wepKey")));
        }
        if let Some(psk) = &self.pre_shared_key {
            write_element(writer, "preSharedKey", psk.expose_secret());
        }
        if let Some(ConfigStatus::Enabled) = self.status {
            write_element(writer, "status", "enabled");
        }

        let _ = writer.write_event(Event::End(BytesEnd::new("WifiProfile")));
    }
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, name: &str, value: &str) {
    let _ = writer.write_event(Event::Start(BytesStart::new(name)));
    let _ = writer.write_event(Event::Text(BytesText::new(value)));
    let _ = writer.write_event(Event::End(BytesEnd::new(name)));
}

fn write_list<'a, W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    values: impl Iterator<Item = &'a str>,
) {
    let joined = values.collect::<Vec<_>>().join(" ");
    if !joined.is_empty() {
        write_element(writer, name, &joined);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_config_has_no_secret() {
        let identity = NetworkIdentity::open("Cafe");
        let config = NetworkConfig::build(&identity, Some(&"ignored".into())).unwrap();

        assert!(!config.hidden);
        assert_eq!(config.key_management, KeyManagement::None);
        assert!(config.wep_key.is_none());
        assert!(config.pre_shared_key.is_none());
        assert!(config.group_ciphers.is_empty());
        assert_eq!(config.status, None);
    }

    #[test]
    fn wep_config_uses_key_index_zero() {
        let identity = NetworkIdentity::new("Legacy", SecurityMode::Wep);
        let config = NetworkConfig::build(&identity, Some(&"abcde".into())).unwrap();

        assert!(config.hidden);
        assert_eq!(config.wep_key.as_ref().unwrap().expose_secret(), "abcde");
        assert_eq!(config.wep_tx_key_index, Some(0));
        assert_eq!(config.auth_algorithms, vec![AuthAlgorithm::Shared]);
        assert_eq!(
            config.group_ciphers,
            vec![Cipher::Ccmp, Cipher::Tkip, Cipher::Wep40, Cipher::Wep104]
        );
        assert_eq!(config.key_management, KeyManagement::None);
        assert!(config.pre_shared_key.is_none());
    }

    #[test]
    fn wpa_config_uses_psk() {
        let identity = NetworkIdentity::new("Home", SecurityMode::Wpa);
        let config = NetworkConfig::build(&identity, Some(&"hunter22".into())).unwrap();

        assert!(config.hidden);
        assert_eq!(
            config.pre_shared_key.as_ref().unwrap().expose_secret(),
            "hunter22"
        );
        assert_eq!(config.key_management, KeyManagement::WpaPsk);
        assert_eq!(config.auth_algorithms, vec![AuthAlgorithm::Open]);
        assert_eq!(config.group_ciphers, vec![Cipher::Tkip, Cipher::Ccmp]);
        assert_eq!(config.pairwise_ciphers, vec![Cipher::Tkip, Cipher::Ccmp]);
        assert_eq!(config.status, Some(ConfigStatus::Enabled));
        assert!(config.wep_key.is_none());
    }

    #[test]
    fn secured_mode_without_credential_is_rejected() {
        let identity = NetworkIdentity::new("Home", SecurityMode::Wpa);
        let err = NetworkConfig::build(&identity, None).unwrap_err();
        assert_eq!(
            err,
            ConnectError::MissingCredential {
                ssid: "Home".to_string(),
                mode: SecurityMode::Wpa,
            }
        );
    }

    #[test]
    fn profile_xml_carries_encoding() {
        let identity = NetworkIdentity::new("Home", SecurityMode::Wpa);
        let mut config = NetworkConfig::build(&identity, Some(&"hunter22".into())).unwrap();
        config.network_id = Some(NetworkId::new(4));

        let xml = config.to_profile_xml();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<ssid>Home</ssid>"));
        assert!(xml.contains("<networkId>4</networkId>"));
        assert!(xml.contains("<keyManagement>WPA-PSK</keyManagement>"));
        assert!(xml.contains("<pairwiseCiphers>TKIP CCMP</pairwiseCiphers>"));
        assert!(xml.contains("<preSharedKey>hunter22</preSharedKey>"));
        assert!(xml.contains("<status>enabled</status>"));
    }

    #[test]
    fn profile_xml_wep_key_index() {
        let identity = NetworkIdentity::new("Legacy", SecurityMode::Wep);
        let config = NetworkConfig::build(&identity, Some(&"abcde".into())).unwrap();

        let xml = config.to_profile_xml();
        assert!(xml.contains(r#"<wepKey index="0">abcde</wepKey>"#));
        assert!(!xml.contains("<networkId>"));
    }
}
