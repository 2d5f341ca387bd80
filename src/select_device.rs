use crate::engine::error::{FilterError, FilterResult};
use log::{debug, warn};
use pnet::datalink::{self, NetworkInterface};

// インターフェース名からデバイスを探す
pub fn select_device(name: &str) -> FilterResult<NetworkInterface> {
    let interfaces = datalink::interfaces();
    debug!(
        "利用可能なデバイス: {:?}",
        interfaces.iter().map(|interface| interface.name.as_str()).collect::<Vec<_>>()
    );

    let selected_interface = find_device(interfaces, name)?;
    if !selected_interface.is_up() {
        warn!("{} はダウンしています", selected_interface.name);
    }

    Ok(selected_interface)
}

fn find_device(interfaces: Vec<NetworkInterface>, name: &str) -> FilterResult<NetworkInterface> {
    interfaces
        .into_iter()
        .find(|interface| interface.name == name)
        .ok_or_else(|| FilterError::InterfaceNotFound(name.to_string()))
}
