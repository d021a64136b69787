//! Invoices and helpers shared by the unit tests.
//!
//! The `BOLT11_*` constants are published BOLT11 test vectors. `invoice` builds
//! syntactically valid invoices with a placeholder timestamp and checksum, which
//! is enough for the decoder since it never verifies either.

use std::io;
use std::sync::{Arc, Mutex};

use bech32::Fe32;
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;

/// Amount-less donation invoice with a literal description.
pub const BOLT11_DONATION: &str = "lnbc1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdpl2pkx2ctnv5sxxmmwwd5kgetjypeh2ursdae8g6twvus8g6rfwvs8qun0dfjkxaq9qrsgq357wnc5r2ueh7ck6q93dj32dlqnls087fxdwk8qakdyafkq3yap9us6v52vjjsrvywa6rt52cm9r9zqt8r2t7mlcwspyetp5h2tztugp9lfyql";

/// 2500u invoice for "1 cup coffee".
pub const BOLT11_COFFEE: &str = "lnbc2500u1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqdq5xysxxatsyp3k7enxv4jsxqzpu9qrsgquk0rl77nj30yxdy8j9vdx85fkpmdla2087ne0xh8nhedh8w27kyke0lp53ut353s06fv3qfegext0eh0ymjpf39tuven09sam30g4vgpfna3rh";

/// 15u invoice for "bolt11.org".
pub const BOLT11_ORG: &str = "lnbc15u1p3xnhl2pp5jptserfk3zk4qy42tlucycrfwxhydvlemu9pqr93tuzlv9cc7g3sdqsvfhkcap3xyhx7un8cqzpgxqzjcsp5f8c52y2stc300gl6s4xswtjpc37hrnnr3c9wvtgjfuvqmpm35evq9qyyssqy4lgd8tj637qcjp05rdpxxykjenthxftej7a2zzmwrmrl70fyj9hvj0rewhzj7jfyuwkwcg9g2jpwtk3wkjtwnkdks84hsnu8xps5vsq4gj5hs";

/// 20m invoice committing to `CAKE_DESCRIPTION` through an `h` field.
pub const BOLT11_DESCRIPTION_HASH: &str = "lnbc20m1pvjluezsp5zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygspp5qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypqhp58yjmdan79s6qqdhdzgynm4zwqd5d7xmw5fk98klysy043l2ahrqs9qrsgq7ea976txfraylvgzuxs8kgcw23ezlrszfnh8r6qtfpr6cxga50aj6txm9rxrydzd06dfeawfk6swupvz4erwnyutnjq7x39ymw6j38gp7ynn44";

pub const CAKE_DESCRIPTION: &str = "One piece of chocolate cake, one icecream cone, one pickle, one slice of swiss cheese, one slice of salami, one lollypop, one piece of cherry pie, one sausage, one cupcake, and one slice of watermelon";

/// Payment hash symbols of the `BOLT11_DONATION`/`BOLT11_COFFEE` vectors.
pub const HASH: &str = "qqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqqqsyqcyq5rqwzqfqypq";

/// Payment hash symbols of `BOLT11_ORG`.
pub const OTHER_HASH: &str = "jptserfk3zk4qy42tlucycrfwxhydvlemu9pqr93tuzlv9cc7g3s";

/// "1 cup coffee" as description symbols.
pub const COFFEE: &str = "xysxxatsyp3k7enxv4js";

/// Builds `lnbc<amount>1<timestamp><fields><signature><checksum>`.
///
/// The signature is `signature` repeated to the full 104 symbols.
pub fn invoice(amount: &str, fields: &[(char, &str)], signature: char) -> String {
    let mut raw = format!("lnbc{amount}1pvjluez");
    for (tag, data) in fields {
        let length = u8::try_from(data.len()).unwrap();
        raw.push(*tag);
        raw.push(Fe32::try_from(length / 32).unwrap().to_char());
        raw.push(Fe32::try_from(length % 32).unwrap().to_char());
        raw.push_str(data);
    }
    raw.extend(std::iter::repeat_n(signature, 104));
    raw.push_str("qqqqqq");
    raw
}

/// Shared in-memory sink for log output.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// A debug-level fmt subscriber writing plain text into this buffer.
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(self.clone())
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Whether some line mentions both `span` and `message`.
    pub fn logged_in_span(&self, span: &str, message: &str) -> bool {
        self.contents()
            .lines()
            .any(|line| line.contains(span) && line.contains(message))
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
