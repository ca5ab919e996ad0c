//! Composite verification: run one plan through both the mock and a
//! real transport and compare the outcomes.
//!
//! The transport is injected; this crate never talks to the network
//! itself. Server-assigned ids are normalized by the equality relation
//! and the verification tolerance (B/I/U and run boundaries) absorbs
//! the known provenance gap. Both sides must also agree on rejection:
//! a request the real API refuses must have been refused by the mock.

use extrasuite_docs_mock::{MockError, apply_batch, strip_provenance};
use extrasuite_docs_reconcile::{ReconcilePlan, bind_placeholder};
use extrasuite_docs_types::{Document, Mismatch, Reply, Request, Tolerance, compare_documents};
use thiserror::Error;
use tracing::debug;

/// Transport failure. Anything with a 4xx status counts as the remote
/// rejecting the batch; other failures propagate untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("transport error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
pub struct TransportError {
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn is_rejection(&self) -> bool {
        self.status.is_some_and(|s| (400..500).contains(&s))
    }
}

/// The injected real side of the comparison.
pub trait Transport {
    fn batch_update(
        &mut self,
        document_id: &str,
        requests: &[Request],
    ) -> Result<Vec<Reply>, TransportError>;

    fn fetch(&mut self, document_id: &str) -> Result<Document, TransportError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Both sides accepted and the documents agree under the tolerance,
    /// or both sides rejected.
    Agree,
    /// Both sides accepted but the documents differ beyond tolerance.
    Diverged,
    /// One side rejected the script and the other did not.
    RejectionMismatch { mock_rejected: bool },
}

/// The verifier's output. On divergence both documents are included so
/// the driver can persist a mismatch log.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub verdict: Verdict,
    pub mismatches: Vec<Mismatch>,
    pub mock_document: Option<Document>,
    pub remote_document: Option<Document>,
    pub mock_error: Option<MockError>,
}

/// Apply a plan through the mock one request at a time, rebinding
/// placeholder container ids as create replies arrive.
pub fn apply_plan_with_mock(
    base: &Document,
    plan: &ReconcilePlan,
) -> Result<(Document, Vec<Reply>), MockError> {
    let mut requests = plan.requests.clone();
    let mut document = base.clone();
    let mut replies = Vec::with_capacity(requests.len());
    for i in 0..requests.len() {
        let step = std::slice::from_ref(&requests[i]);
        let (next, mut step_replies) = apply_batch(&document, step)?;
        document = next;
        let reply = step_replies.pop().expect("one reply per request");
        if let Some(binding) = plan
            .placeholders
            .iter()
            .find(|b| b.request_index == i)
            && let Some(actual) = reply_id(&reply)
        {
            let actual = actual.to_string();
            bind_placeholder(&mut requests[i + 1..], &binding.placeholder_id, &actual);
        }
        replies.push(reply);
    }
    Ok((document, replies))
}

fn reply_id(reply: &Reply) -> Option<&str> {
    match reply {
        Reply::CreateHeader(r) => Some(&r.header_id),
        Reply::CreateFooter(r) => Some(&r.footer_id),
        Reply::CreateFootnote(r) => Some(&r.footnote_id),
        Reply::AddDocumentTab(r) => Some(&r.tab_id),
        Reply::Empty => None,
    }
}

/// Run the plan through both sides and compare.
///
/// The remote side receives the request list as one batch, so a plan
/// that creates containers (and therefore carries placeholder bindings)
/// needs a transport that resolves ids server-side or a driver that
/// dispatches stepwise with [`bind_placeholder`]; the mock side always
/// rebinds stepwise.
pub fn verify_plan(
    transport: &mut dyn Transport,
    document_id: &str,
    base: &Document,
    plan: &ReconcilePlan,
) -> Result<VerifyReport, TransportError> {
    let mock_outcome = apply_plan_with_mock(base, plan);
    let remote_outcome = transport.batch_update(document_id, &plan.requests);

    match (mock_outcome, remote_outcome) {
        (Ok((mut mock_document, _)), Ok(_)) => {
            let remote_document = transport.fetch(document_id)?;
            strip_provenance(&mut mock_document);
            let mismatches = compare_documents(
                &mock_document,
                &remote_document,
                Tolerance::verification(),
            );
            let verdict = if mismatches.is_empty() {
                Verdict::Agree
            } else {
                Verdict::Diverged
            };
            debug!(?verdict, mismatches = mismatches.len(), "verification finished");
            Ok(VerifyReport {
                verdict,
                mismatches,
                mock_document: Some(mock_document),
                remote_document: Some(remote_document),
                mock_error: None,
            })
        }
        (Err(mock_error), Err(remote_error)) if remote_error.is_rejection() => {
            Ok(VerifyReport {
                verdict: Verdict::Agree,
                mismatches: Vec::new(),
                mock_document: None,
                remote_document: None,
                mock_error: Some(mock_error),
            })
        }
        (Ok(_), Err(remote_error)) if remote_error.is_rejection() => Ok(VerifyReport {
            verdict: Verdict::RejectionMismatch {
                mock_rejected: false,
            },
            mismatches: Vec::new(),
            mock_document: None,
            remote_document: None,
            mock_error: None,
        }),
        (Err(mock_error), Ok(_)) => Ok(VerifyReport {
            verdict: Verdict::RejectionMismatch {
                mock_rejected: true,
            },
            mismatches: Vec::new(),
            mock_document: None,
            remote_document: None,
            mock_error: Some(mock_error),
        }),
        (_, Err(remote_error)) => Err(remote_error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extrasuite_docs_reconcile::reconcile;
    use extrasuite_docs_types::paragraph::{Paragraph, ParagraphElement, TextRun};
    use extrasuite_docs_types::style::TextStyle;
    use extrasuite_docs_types::{
        SectionBreak, Segment, SegmentId, StructuralElement, Tab,
    };

    fn doc(text: &str) -> Document {
        let mut doc = Document {
            document_id: "doc1".to_string(),
            title: "t".to_string(),
            tabs: vec![Tab {
                tab_id: "t.0".to_string(),
                body: Segment {
                    id: SegmentId::Body,
                    content: vec![
                        StructuralElement::SectionBreak(SectionBreak::default()),
                        StructuralElement::Paragraph(Paragraph {
                            elements: vec![ParagraphElement::TextRun(TextRun {
                                text: text.to_string(),
                                style: TextStyle::default(),
                                ..TextRun::default()
                            })],
                            ..Paragraph::default()
                        }),
                    ],
                },
                ..Tab::default()
            }],
        };
        doc.reindex();
        doc
    }

    /// A "remote" backed by the mock itself: the honest case.
    struct MockBackedTransport {
        document: Document,
    }

    impl Transport for MockBackedTransport {
        fn batch_update(
            &mut self,
            _document_id: &str,
            requests: &[Request],
        ) -> Result<Vec<Reply>, TransportError> {
            let (next, replies) =
                apply_batch(&self.document, requests).map_err(|e| TransportError {
                    status: Some(400),
                    message: e.to_string(),
                })?;
            self.document = next;
            Ok(replies)
        }

        fn fetch(&mut self, _document_id: &str) -> Result<Document, TransportError> {
            Ok(self.document.clone())
        }
    }

    /// A remote that rejects everything with a 400.
    struct RejectingTransport;

    impl Transport for RejectingTransport {
        fn batch_update(
            &mut self,
            _document_id: &str,
            _requests: &[Request],
        ) -> Result<Vec<Reply>, TransportError> {
            Err(TransportError {
                status: Some(400),
                message: "Invalid requests".to_string(),
            })
        }

        fn fetch(&mut self, _document_id: &str) -> Result<Document, TransportError> {
            unreachable!("fetch is never reached after a rejection")
        }
    }

    #[test]
    fn honest_remote_agrees() {
        let base = doc("Hello World\n");
        let desired = doc("Hello Beautiful World\n");
        let plan = reconcile(&base, &desired).unwrap();
        let mut transport = MockBackedTransport {
            document: base.clone(),
        };
        let report = verify_plan(&mut transport, "doc1", &base, &plan).unwrap();
        assert_eq!(report.verdict, Verdict::Agree);
        assert!(report.mismatches.is_empty());
    }

    #[test]
    fn tampered_remote_diverges() {
        let base = doc("Hello World\n");
        let desired = doc("Hello Beautiful World\n");
        let plan = reconcile(&base, &desired).unwrap();
        struct Tampering {
            inner: MockBackedTransport,
        }
        impl Transport for Tampering {
            fn batch_update(
                &mut self,
                id: &str,
                requests: &[Request],
            ) -> Result<Vec<Reply>, TransportError> {
                self.inner.batch_update(id, requests)
            }
            fn fetch(&mut self, id: &str) -> Result<Document, TransportError> {
                // Return a different document than it committed.
                let _ = self.inner.fetch(id)?;
                Ok(doc("Something Else Entirely\n"))
            }
        }
        let mut transport = Tampering {
            inner: MockBackedTransport {
                document: base.clone(),
            },
        };
        let report = verify_plan(&mut transport, "doc1", &base, &plan).unwrap();
        assert_eq!(report.verdict, Verdict::Diverged);
        assert!(!report.mismatches.is_empty());
        assert!(report.mock_document.is_some());
        assert!(report.remote_document.is_some());
    }

    #[test]
    fn rejection_must_match() {
        let base = doc("Hello\n");
        let desired = doc("Hello there\n");
        let plan = reconcile(&base, &desired).unwrap();
        let mut transport = RejectingTransport;
        let report = verify_plan(&mut transport, "doc1", &base, &plan).unwrap();
        assert_eq!(
            report.verdict,
            Verdict::RejectionMismatch {
                mock_rejected: false
            }
        );
    }

    #[test]
    fn server_errors_propagate() {
        struct FlakyTransport;
        impl Transport for FlakyTransport {
            fn batch_update(
                &mut self,
                _: &str,
                _: &[Request],
            ) -> Result<Vec<Reply>, TransportError> {
                Err(TransportError {
                    status: Some(503),
                    message: "backend unavailable".to_string(),
                })
            }
            fn fetch(&mut self, _: &str) -> Result<Document, TransportError> {
                unreachable!()
            }
        }
        let base = doc("Hello\n");
        let desired = doc("Hello!\n");
        let plan = reconcile(&base, &desired).unwrap();
        let err = verify_plan(&mut FlakyTransport, "doc1", &base, &plan).unwrap_err();
        assert_eq!(err.status, Some(503));
    }
}
