//! Wire payload rendering. Items arrive already framed (newline-terminated)
//! so the payload is their plain concatenation.

use crate::buffer::{Batch, Item};
use bytes::{Bytes, BytesMut};

pub fn render(batch: &Batch) -> Bytes {
    render_items(batch.items())
}

pub fn render_items(items: &[Item]) -> Bytes {
    if let [single] = items {
        return single.clone();
    }

    let capacity = items.iter().map(Bytes::len).sum();
    let mut payload = BytesMut::with_capacity(capacity);
    for item in items {
        payload.extend_from_slice(item);
    }
    payload.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_PAIR: &[u8] = b"{\"index\":{\"_index\":\"logs\"}}\n{\"msg\":\"hello\"}\n";

    #[test]
    fn items_are_concatenated_without_separators() {
        let items = vec![Bytes::from_static(b"ab"), Bytes::from_static(b"cd\n")];
        assert_eq!(render_items(&items), Bytes::from_static(b"abcd\n"));
    }

    #[test]
    fn framing_is_independent_of_how_items_were_split() {
        let whole = render_items(&[Bytes::from_static(INDEX_PAIR)]);
        let split_at = INDEX_PAIR.iter().position(|b| *b == b'\n').unwrap() + 1;
        let halves = render_items(&[
            Bytes::copy_from_slice(&INDEX_PAIR[..split_at]),
            Bytes::copy_from_slice(&INDEX_PAIR[split_at..]),
        ]);

        assert_eq!(whole, halves);
        assert_eq!(&whole[..], INDEX_PAIR);
    }

    #[test]
    fn empty_item_list_renders_empty_payload() {
        assert!(render_items(&[]).is_empty());
    }
}
