//! Trip extraction from TRIAS offer documents.
//!
//! The document is read as a stream of namespace-resolved events. Parsing is
//! lenient in the way a recovering XML parser is: an end tag closes every
//! element opened after its matching start tag, an end tag matching nothing
//! open is ignored, and a syntax error or end of input after the first
//! element closes whatever is still open and keeps the trips read so far.

use indexmap::IndexMap;
use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use tracing::{debug, warn};

use crate::error::ExtractError;

/// Default namespace of TRIAS documents.
pub const TRIAS_NAMESPACE: &[u8] = b"http://www.vdv.de/trias";

pub type TripId = String;

/// A trip found in an offer document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub id: TripId,
    /// Index of the `Trip` element among all `Trip` elements of the document.
    pub position: usize,
}

/// Trips keyed by id, in order of first appearance.
pub type TripMap = IndexMap<TripId, Trip>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Other,
    Trip,
    TripId,
}

struct OpenElement {
    name: Vec<u8>,
    role: Role,
}

struct OpenTrip {
    position: usize,
    id: Option<String>,
    reading_id: bool,
    text: String,
}

/// Tracks open elements and trips while the event stream is read.
#[derive(Default)]
struct TripCollector {
    elements: Vec<OpenElement>,
    open_trips: Vec<OpenTrip>,
    closed: Vec<Trip>,
    trip_elements: usize,
    seen_element: bool,
}

impl TripCollector {
    fn open(&mut self, name: &[u8], local_name: &[u8], in_trias: bool) {
        self.seen_element = true;

        let role = match local_name {
            b"Trip" if in_trias => {
                self.open_trips.push(OpenTrip {
                    position: self.trip_elements,
                    id: None,
                    reading_id: false,
                    text: String::new(),
                });
                self.trip_elements += 1;
                Role::Trip
            }
            // the first TripId descendant names every enclosing trip still without one
            b"TripId" if in_trias => {
                let mut started = false;
                for trip in self.open_trips.iter_mut() {
                    if trip.id.is_none() && !trip.reading_id {
                        trip.reading_id = true;
                        started = true;
                    }
                }
                if started { Role::TripId } else { Role::Other }
            }
            _ => Role::Other,
        };

        self.elements.push(OpenElement {
            name: name.to_vec(),
            role,
        });
    }

    fn text(&mut self, text: &str) {
        for trip in self.open_trips.iter_mut().filter(|t| t.reading_id) {
            trip.text.push_str(text);
        }
    }

    /// Closes the innermost open element named `name` and everything opened after it.
    fn close(&mut self, name: &[u8]) {
        match self.elements.iter().rposition(|e| e.name == name) {
            Some(index) => {
                while self.elements.len() > index {
                    self.pop_element();
                }
            }
            None => debug!(
                name = %String::from_utf8_lossy(name),
                "Ignoring end tag without matching start tag"
            ),
        }
    }

    fn close_all(&mut self) {
        while !self.elements.is_empty() {
            self.pop_element();
        }
    }

    fn pop_element(&mut self) {
        let Some(element) = self.elements.pop() else {
            return;
        };
        match element.role {
            Role::TripId => {
                for trip in self.open_trips.iter_mut().filter(|t| t.reading_id) {
                    trip.id = Some(trip.text.trim().to_string());
                    trip.reading_id = false;
                }
            }
            Role::Trip => {
                if let Some(trip) = self.open_trips.pop() {
                    self.close_trip(trip);
                }
            }
            Role::Other => {}
        }
    }

    fn close_trip(&mut self, trip: OpenTrip) {
        match trip.id.filter(|id| !id.is_empty()) {
            Some(id) => self.closed.push(Trip {
                id,
                position: trip.position,
            }),
            None => warn!(position = trip.position, "Skipping trip without TripId"),
        }
    }

    fn finish(mut self) -> Result<TripMap, ExtractError> {
        if !self.seen_element {
            return Err(ExtractError::EmptyTree);
        }
        if self.trip_elements == 0 {
            return Err(ExtractError::InvalidData);
        }

        // nested trips close inner-first; insert in document order
        self.closed.sort_by_key(|trip| trip.position);

        let mut trips = TripMap::with_capacity(self.closed.len());
        for trip in self.closed {
            let position = trip.position;
            if let Some(previous) = trips.insert(trip.id.clone(), trip) {
                debug!(
                    trip_id = %previous.id,
                    replaced_position = previous.position,
                    position,
                    "Duplicate TripId, keeping later trip"
                );
            }
        }

        debug!(
            trip_elements = self.trip_elements,
            unique_trips = trips.len(),
            "Trips extracted from offer document"
        );
        Ok(trips)
    }
}

/// Extracts every TRIAS `Trip` of `offers`, keyed by its `TripId`.
///
/// A later trip with an already seen id replaces the earlier record.
///
/// # Errors
///
/// [`ExtractError::EmptyTree`] if no element could be read at all,
/// [`ExtractError::InvalidData`] if the document holds no `Trip` element.
pub fn extract_trips(offers: &str) -> Result<TripMap, ExtractError> {
    let mut reader = NsReader::from_str(offers);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut collector = TripCollector::default();

    loop {
        let (ns, event) = match reader.read_resolved_event() {
            Ok(resolved) => resolved,
            Err(e) => {
                if !collector.seen_element {
                    debug!(error = %e, "Offer document has no readable element");
                    return Err(ExtractError::EmptyTree);
                }
                warn!(error = %e, "Malformed offer document, keeping trips read so far");
                break;
            }
        };
        let in_trias = matches!(ns, ResolveResult::Bound(Namespace(n)) if n == TRIAS_NAMESPACE);

        match event {
            Event::Start(e) => {
                collector.open(e.name().as_ref(), e.local_name().as_ref(), in_trias);
            }
            Event::Empty(e) => {
                let name = e.name();
                collector.open(name.as_ref(), e.local_name().as_ref(), in_trias);
                collector.close(name.as_ref());
            }
            Event::Text(e) => match e.unescape() {
                Ok(text) => collector.text(&text),
                Err(_) => collector.text(&String::from_utf8_lossy(&e)),
            },
            Event::CData(e) => collector.text(&String::from_utf8_lossy(&e)),
            Event::End(e) => collector.close(e.name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
    }

    if !collector.elements.is_empty() {
        debug!(
            unclosed = collector.elements.len(),
            "Closing elements left open at end of document"
        );
    }
    collector.close_all();
    collector.finish()
}
