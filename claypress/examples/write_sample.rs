use claypress::{
    pdf::{dictionary, CbString, Name, Object, Stream},
    Document, SaveOptions,
};
use std::path::PathBuf;
use structopt::StructOpt;

/// Write a one page PDF.
#[derive(StructOpt, Debug)]
#[structopt(name = "write-sample")]
struct Opt {
    /// Output file
    #[structopt(short, long, parse(from_os_str))]
    output: PathBuf,

    /// Use object streams and a cross-reference stream
    #[structopt(short, long)]
    compress: bool,

    /// Objects per object stream
    #[structopt(long, default_value = "200")]
    object_stream_size: usize,
}

fn sample_document() -> Document {
    let mut doc = Document::new();
    let content = doc.add_object(Stream::new(
        Default::default(),
        b"BT /F1 24 Tf 72 720 Td (Hello from claypress) Tj ET".to_vec(),
    ));
    let pages = doc.add_object(Object::Null);
    let page = doc.add_object(dictionary([
        ("Type", Object::from(Name::from_str("Page"))),
        ("Parent", pages.into()),
        ("Contents", content.into()),
        (
            "MediaBox",
            vec![Object::from(0), 0.into(), 612.into(), 792.into()].into(),
        ),
        (
            "Resources",
            dictionary([(
                "Font",
                dictionary([(
                    "F1",
                    dictionary([
                        ("Type", Name::from_str("Font")),
                        ("Subtype", Name::from_str("Type1")),
                        ("BaseFont", Name::from_str("Helvetica")),
                    ]),
                )]),
            )])
            .into(),
        ),
    ]));
    doc.insert_object(
        pages,
        dictionary([
            ("Type", Object::from(Name::from_str("Pages"))),
            ("Kids", vec![Object::from(page)].into()),
            ("Count", 1.into()),
        ]),
    );
    let catalog = doc.add_object(dictionary([
        ("Type", Object::from(Name::from_str("Catalog"))),
        ("Pages", pages.into()),
    ]));
    doc.set_root(catalog);
    doc.set_info(dictionary([("Producer", CbString::from("claypress"))]));
    doc
}

pub fn main() {
    env_logger::init();
    let opt = Opt::from_args();

    let options = SaveOptions::builder()
        .use_object_streams(opt.compress)
        .object_stream_size(opt.object_stream_size)
        .build();

    log::debug!("Write to file");
    if let Err(e) = claypress::save_to_file(&sample_document(), opt.output.as_path(), options) {
        log::error!("Error while writing: {:?}", e);
    }
}
