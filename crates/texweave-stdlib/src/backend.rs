//! Backends that receive finished lists.
//!
//! A backend is a sink: every completed paragraph or display is shipped to it once,
//!     and it is not consulted again.
//! An I/O failure in the sink is a fatal engine error.

use boxworks::node::{Horizontal, VList, Vertical};
use boxworks::show;
use std::collections::BTreeMap;
use std::io::{self, Write};
use texweave::config::BackendKind;

/// A sink for finished vertical lists.
pub trait Backend {
    /// Ship a finished list.
    ///
    /// The `font_name` closure maps font numbers in character nodes to font names.
    fn ship(&mut self, list: &VList, font_name: &dyn Fn(u32) -> String) -> io::Result<()>;
}

/// Creates the backend for the provided kind.
pub fn new_backend(kind: BackendKind, out: Box<dyn Write>) -> Box<dyn Backend> {
    match kind {
        BackendKind::Text => Box::new(TextBackend::new(out)),
        BackendKind::Json => Box::new(JsonBackend::new(out)),
    }
}

/// Backend that writes lists in the format of TeX's `\showbox`.
pub struct TextBackend<W> {
    out: W,
    num_shipped: usize,
}

impl<W: Write> TextBackend<W> {
    pub fn new(out: W) -> Self {
        TextBackend {
            out,
            num_shipped: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Backend for TextBackend<W> {
    fn ship(&mut self, list: &VList, font_name: &dyn Fn(u32) -> String) -> io::Result<()> {
        self.num_shipped += 1;
        let mut s = format!("Completed list {}:\n", self.num_shipped);
        let root = [Vertical::VList(list.clone())];
        show::write_vertical_list(&mut s, &root, font_name)
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "failed to format the list"))?;
        s.push('\n');
        self.out.write_all(s.as_bytes())?;
        self.out.flush()
    }
}

/// Backend that writes one JSON document per line for each shipped list.
pub struct JsonBackend<W> {
    out: W,
    num_shipped: usize,
}

#[derive(serde::Serialize)]
struct Shipped<'a> {
    index: usize,
    fonts: BTreeMap<u32, String>,
    list: &'a VList,
}

impl<W: Write> JsonBackend<W> {
    pub fn new(out: W) -> Self {
        JsonBackend {
            out,
            num_shipped: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Backend for JsonBackend<W> {
    fn ship(&mut self, list: &VList, font_name: &dyn Fn(u32) -> String) -> io::Result<()> {
        self.num_shipped += 1;
        let mut fonts = BTreeMap::new();
        collect_fonts_vertical(&list.list, &mut |font| {
            fonts.entry(font).or_insert_with(|| font_name(font));
        });
        let shipped = Shipped {
            index: self.num_shipped,
            fonts,
            list,
        };
        serde_json::to_writer(&mut self.out, &shipped)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

fn collect_fonts_vertical(list: &[Vertical], f: &mut dyn FnMut(u32)) {
    for node in list {
        match node {
            Vertical::HList(b) => collect_fonts_horizontal(&b.list, f),
            Vertical::VList(b) => collect_fonts_vertical(&b.list, f),
            Vertical::Rule(_) | Vertical::Glue(_) | Vertical::Kern(_) | Vertical::Penalty(_) => {}
        }
    }
}

fn collect_fonts_horizontal(list: &[Horizontal], f: &mut dyn FnMut(u32)) {
    for node in list {
        match node {
            Horizontal::Char(c) => f(c.font),
            Horizontal::HList(b) => collect_fonts_horizontal(&b.list, f),
            Horizontal::VList(b) => collect_fonts_vertical(&b.list, f),
            Horizontal::Rule(_)
            | Horizontal::Math(_)
            | Horizontal::Glue(_)
            | Horizontal::Kern(_)
            | Horizontal::Penalty(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxworks::node::{Char, Kern};
    use boxworks::pack::{hpack, vpack};
    use common::Scaled;

    fn list() -> VList {
        vpack(vec![Vertical::HList(hpack(vec![
            Horizontal::Char(Char {
                char: 'a',
                font: 1,
                width: Scaled::ONE * 5,
                height: Scaled::ONE * 4,
                depth: Scaled::ZERO,
            }),
            Horizontal::Kern(Kern::new(Scaled::ONE)),
        ]))])
    }

    fn font_name(font: u32) -> String {
        format!("font{font}")
    }

    #[test]
    fn text_backend() {
        let mut backend = TextBackend::new(Vec::<u8>::new());
        backend.ship(&list(), &font_name).unwrap();
        backend.ship(&list(), &font_name).unwrap();
        let output = String::from_utf8(backend.into_inner()).unwrap();
        let want = "Completed list 1:\n\
            \\vbox(4.0+0.0)x6.0\n\
            .\\hbox(4.0+0.0)x6.0\n\
            ..\\font1 a\n\
            ..\\kern1.0\n\
            \n\
            Completed list 2:\n";
        assert!(output.starts_with(want), "{output}");
    }

    #[test]
    fn json_backend() {
        let mut backend = JsonBackend::new(Vec::<u8>::new());
        backend.ship(&list(), &font_name).unwrap();
        backend.ship(&VList::default(), &font_name).unwrap();
        let output = String::from_utf8(backend.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["index"], 1);
        assert_eq!(first["fonts"]["1"], "font1");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["index"], 2);
        assert_eq!(second["fonts"], serde_json::json!({}));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failures_are_reported() {
        for kind in [BackendKind::Text, BackendKind::Json] {
            let mut backend = new_backend(kind, Box::new(FailingWriter));
            assert!(backend.ship(&list(), &font_name).is_err());
        }
    }
}
