#[macro_use]
extern crate afl;
extern crate ed2k_chunked;

use ed2k_chunked::digest::Digest;
use ed2k_chunked::{Ed2kBlue, Ed2kRed, Ed2kRedBlue};

fn main() {
    fuzz!(|data: &[u8]| {
        let blue = Ed2kBlue::digest(data);
        let red = Ed2kRed::digest(data);
        let red_blue = Ed2kRedBlue::digest(data);
        assert_eq!(&red_blue[..16], &red[..]);
        assert_eq!(&red_blue[16..], &blue[..]);

        // the first byte picks a split point for the incremental path
        if let Some((&at, rest)) = data.split_first() {
            let (head, tail) = rest.split_at(usize::from(at).min(rest.len()));
            let mut hasher = Ed2kBlue::new();
            hasher.write(head).unwrap();
            hasher.write(tail).unwrap();

            let mut whole = Ed2kBlue::new();
            whole.write(rest).unwrap();
            assert_eq!(hasher.sum_blue().unwrap(), whole.sum_blue().unwrap());
            assert_eq!(hasher.sum_red().unwrap(), whole.sum_red().unwrap());
        }
    });
}
